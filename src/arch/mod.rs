cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "arm", target_feature = "thumb2"))] {
        mod cortex_m;
        pub(crate) use self::cortex_m::*;
    } else {
        pub(crate) mod host;
        pub(crate) use self::host::*;
    }
}
