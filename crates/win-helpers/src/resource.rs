use windows::Win32::Foundation::{HINSTANCE, HMODULE};
use windows::Win32::UI::WindowsAndMessaging::{HICON, IMAGE_ICON, LR_DEFAULTCOLOR, LoadImageW, LoadStringW};
use windows::core::{Owned, PCWSTR, PWSTR};

/// `MAKEINTRESOURCEW`.
fn make_int_resource(id: u16) -> PCWSTR {
    PCWSTR(usize::from(id) as *const u16)
}

/// Loads the icon resource `id` of `module` at the requested size.
///
/// A width or height of zero selects the size of the resource itself.
pub fn load_icon_resource(module: HMODULE, id: u16, width: i32, height: i32) -> anyhow::Result<Owned<HICON>> {
    // SAFETY: `make_int_resource` gives an integer resource identifier, which `LoadImageW` accepts in
    // place of a name.
    let handle = unsafe {
        LoadImageW(
            Some(HINSTANCE(module.0)),
            make_int_resource(id),
            IMAGE_ICON,
            width,
            height,
            LR_DEFAULTCOLOR,
        )
    }?;

    // SAFETY: `LoadImageW` succeeded with `IMAGE_ICON`, the handle is an icon owned by us
    // (`LR_SHARED` is not set) and destroyed by `Owned`.
    Ok(unsafe { Owned::new(HICON(handle.0)) })
}

/// Loads the string resource `id` of `hinstance`, `None` when there is no such string.
pub fn load_string_resource(hinstance: HINSTANCE, id: u32) -> anyhow::Result<Option<String>> {
    let mut resource_ptr = PWSTR::null();

    // SAFETY: With a zero buffer length, `LoadStringW` writes a read-only pointer to the resource
    // in the location passed as buffer. `resource_ptr` is a valid location for a pointer.
    let length = unsafe {
        LoadStringW(
            Some(hinstance),
            id,
            PWSTR(core::ptr::from_mut(&mut resource_ptr).cast()),
            0,
        )
    };

    let length = usize::try_from(length)?;

    if length == 0 || resource_ptr.is_null() {
        return Ok(None);
    }

    // SAFETY: On success, `resource_ptr` points to `length` UTF-16 units owned by the module,
    // valid as long as the module is loaded.
    let resource = unsafe { core::slice::from_raw_parts(resource_ptr.0.cast_const(), length) };

    Ok(Some(String::from_utf16(resource)?))
}
