#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::singleton;
use cortex_m_rt::{entry, exception};
use cortex_m_semihosting::{
    debug::{self, EXIT_FAILURE, EXIT_SUCCESS},
    hprintln as println,
};

use panic_semihosting as _;

/// lm3s6965evb core clock under QEMU
const CLOCK_HZ: u32 = 12_000_000;
const TICKS_PER_SEC: u32 = 100;
const RUN_TICKS: u32 = 2 * TICKS_PER_SEC;

static TICKS: AtomicU32 = AtomicU32::new(0);
static TOGGLES: [AtomicU32; 3] = [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];

#[exception]
fn SysTick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    artos::tick();
}

fn blink(led: usize, period: u32) -> ! {
    loop {
        let n = TOGGLES[led].fetch_add(1, Ordering::Relaxed) + 1;
        println!(
            "tick {}: led {} {}",
            TICKS.load(Ordering::Relaxed),
            led,
            if n % 2 == 1 { "on" } else { "off" }
        );
        artos::delay(period);
    }
}

fn blinky1() -> ! {
    blink(0, TICKS_PER_SEC / 4)
}

fn blinky2() -> ! {
    blink(1, TICKS_PER_SEC / 2)
}

fn blinky3() -> ! {
    blink(2, TICKS_PER_SEC)
}

/// Highest priority: ends the run once enough ticks have passed.
fn supervisor() -> ! {
    loop {
        artos::delay(RUN_TICKS);

        let ticks = TICKS.load(Ordering::Relaxed);
        let mut ok = true;
        for (led, period) in [TICKS_PER_SEC / 4, TICKS_PER_SEC / 2, TICKS_PER_SEC]
            .into_iter()
            .enumerate()
        {
            let toggles = TOGGLES[led].load(Ordering::Relaxed);
            println!("led {}: {} toggles in {} ticks", led, toggles, ticks);
            ok &= toggles.abs_diff(ticks / period) <= 1;
        }
        debug::exit(if ok { EXIT_SUCCESS } else { EXIT_FAILURE });
    }
}

/// fresh 1 KiB stack, one per call site
macro_rules! stack {
    () => {
        singleton!(: [u32; 256] = [0; 256]).unwrap()
    };
}

#[entry]
fn main() -> ! {
    println!("main() starting kernel");

    artos::init(
        singleton!(: [u32; 128] = [0; 128]).unwrap(),
        cortex_m::asm::nop,
    );
    artos::start_thread(5, blinky1, stack!());
    artos::start_thread(2, blinky2, stack!());
    artos::start_thread(1, blinky3, stack!());
    artos::start_thread(10, supervisor, stack!());

    artos::run(|| {
        // SAFETY: SysTick is only configured here, before any thread runs.
        let mut p = unsafe { cortex_m::Peripherals::steal() };
        p.SYST.set_clock_source(SystClkSource::Core);
        p.SYST.set_reload(CLOCK_HZ / TICKS_PER_SEC - 1);
        p.SYST.clear_current();
        p.SYST.enable_counter();
        p.SYST.enable_interrupt();
    })
}
