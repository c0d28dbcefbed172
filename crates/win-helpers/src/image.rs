//! Icon to bitmap conversion, for menu item images.

/// Row stride and total size, in bytes, of a top-down 32 bits per pixel DIB.
///
/// Returns `None` when the dimensions do not fit a `BITMAPINFOHEADER` or the size overflows.
pub fn dib_layout(width: u32, height: u32) -> Option<(u32, u32)> {
    i32::try_from(width).ok()?;
    i32::try_from(height).ok()?;

    let stride = width.checked_mul(4)?;
    let size = stride.checked_mul(height)?;

    Some((stride, size))
}

#[cfg(target_os = "windows")]
pub use self::win_ext::*;

#[cfg(target_os = "windows")]
mod win_ext {
    use core::ffi::c_void;

    use anyhow::Context as _;
    use tracing::warn;
    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateDIBSection, DIB_RGB_COLORS, GetDC, HBITMAP, HDC, ReleaseDC,
    };
    use windows::Win32::Graphics::Imaging::{
        CLSID_WICImagingFactory, GUID_WICPixelFormat32bppPBGRA, IWICImagingFactory, IWICPalette,
        WICBitmapDitherTypeNone, WICBitmapPaletteTypeCustom,
    };
    use windows::Win32::System::Com::{CLSCTX_INPROC_SERVER, CoCreateInstance};
    use windows::Win32::UI::WindowsAndMessaging::HICON;
    use windows::core::Owned;

    use super::dib_layout;
    use crate::resource::load_icon_resource;

    /// Device context of the screen.
    struct ScreenDc(HDC);

    impl ScreenDc {
        fn get() -> anyhow::Result<Self> {
            // SAFETY: FFI call with no outstanding precondition.
            let hdc = unsafe { GetDC(None) };

            if hdc.is_invalid() {
                anyhow::bail!("failed to get the screen device context");
            }

            Ok(Self(hdc))
        }
    }

    impl Drop for ScreenDc {
        fn drop(&mut self) {
            // SAFETY: The DC was retrieved with `GetDC(None)`.
            if unsafe { ReleaseDC(None, self.0) } == 0 {
                warn!("Failed to release the screen device context");
            }
        }
    }

    /// Converts `icon` to a 32 bits per pixel premultiplied BGRA bitmap, preserving transparency.
    ///
    /// COM must be initialized on the calling thread. The icon stays owned by the caller.
    pub fn bitmap_from_icon(icon: HICON) -> anyhow::Result<Owned<HBITMAP>> {
        // SAFETY: COM is initialized by the caller.
        let factory: IWICImagingFactory = unsafe { CoCreateInstance(&CLSID_WICImagingFactory, None, CLSCTX_INPROC_SERVER) }
            .context("failed to create the WIC imaging factory")?;

        // SAFETY: `icon` is a valid icon handle, copied by WIC.
        let bitmap = unsafe { factory.CreateBitmapFromHICON(icon) }.context("failed to read the icon")?;

        // SAFETY: FFI call with no outstanding precondition.
        let converter = unsafe { factory.CreateFormatConverter() }?;

        // SAFETY: `bitmap` is a valid bitmap source and the pixel format GUID outlives the call.
        unsafe {
            converter.Initialize(
                &bitmap,
                &GUID_WICPixelFormat32bppPBGRA,
                WICBitmapDitherTypeNone,
                None::<&IWICPalette>,
                0.0,
                WICBitmapPaletteTypeCustom,
            )
        }
        .context("failed to convert the icon to PBGRA")?;

        let (mut width, mut height) = (0, 0);

        // SAFETY: Both pointers are valid for writes.
        unsafe { converter.GetSize(&mut width, &mut height) }?;

        let (stride, size) = dib_layout(width, height).context("icon is too large")?;

        let bitmap_info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: u32::try_from(size_of::<BITMAPINFOHEADER>())?,
                biWidth: i32::try_from(width)?,
                // Negative height for a top-down DIB.
                biHeight: -i32::try_from(height)?,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let screen = ScreenDc::get()?;
        let mut bits: *mut c_void = core::ptr::null_mut();

        // SAFETY: `bitmap_info` describes a valid 32-bit DIB and `bits` is valid for writes.
        let dib = unsafe { CreateDIBSection(Some(screen.0), &bitmap_info, DIB_RGB_COLORS, &mut bits, None, 0) }
            .context("failed to create the DIB section")?;

        // SAFETY: `CreateDIBSection` succeeded, the bitmap is owned by us and deleted on error.
        let dib = unsafe { Owned::new(dib) };

        if bits.is_null() {
            anyhow::bail!("DIB section has no pixel buffer");
        }

        // SAFETY: The DIB section pixel buffer holds `stride * height` bytes and lives as long as `dib`.
        let pixels = unsafe { core::slice::from_raw_parts_mut(bits.cast::<u8>(), usize::try_from(size)?) };

        // SAFETY: `pixels` is exactly `stride * height` bytes long. A null rectangle copies the whole image.
        unsafe { converter.CopyPixels(core::ptr::null(), stride, pixels) }.context("failed to copy the icon pixels")?;

        Ok(dib)
    }

    /// Loads the icon resource `id` of `module` and converts it with [`bitmap_from_icon`].
    pub fn bitmap_from_icon_resource(module: HMODULE, id: u16, width: i32, height: i32) -> anyhow::Result<Owned<HBITMAP>> {
        let icon = load_icon_resource(module, id, width, height)?;
        bitmap_from_icon(*icon)
    }
}
