use windows::Win32::System::Com::{COINIT, CoInitializeEx, CoUninitialize};

/// Initializes COM on the calling thread for the lifetime of the value.
///
/// Required by the WIC conversions of [`crate::image`] and by shell data objects.
pub struct ComContext;

impl ComContext {
    pub fn try_new(coinit: COINIT) -> anyhow::Result<Self> {
        // SAFETY: Must not be called from `DllMain`. Can be called multiple times on a thread.
        unsafe { CoInitializeEx(None, coinit) }.ok()?;

        Ok(Self)
    }
}

impl Drop for ComContext {
    fn drop(&mut self) {
        // SAFETY: Must be called once for each successful `CoInitializeEx`.
        unsafe { CoUninitialize() };
    }
}

#[cfg(test)]
mod tests {
    use windows::Win32::System::Com::{COINIT_APARTMENTTHREADED, COINIT_MULTITHREADED};

    use super::*;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn nests_on_the_same_thread() {
        std::thread::spawn(|| {
            let outer = ComContext::try_new(COINIT_MULTITHREADED).expect("first initialization");
            let inner = ComContext::try_new(COINIT_MULTITHREADED).expect("nested initialization");
            drop(inner);
            drop(outer);
        })
        .join()
        .expect("thread");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn rejects_apartment_change() {
        std::thread::spawn(|| {
            let _ctx = ComContext::try_new(COINIT_MULTITHREADED).expect("initialization");
            assert!(ComContext::try_new(COINIT_APARTMENTTHREADED).is_err());
        })
        .join()
        .expect("thread");
    }
}
