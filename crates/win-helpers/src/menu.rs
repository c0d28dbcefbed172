use std::collections::VecDeque;

use anyhow::Context as _;
use windows::Win32::Graphics::Gdi::HBITMAP;
use windows::Win32::UI::WindowsAndMessaging::{
    GetMenuItemCount, GetMenuItemID, GetSubMenu, HMENU, InsertMenuItemW, MENUITEMINFOW, MFT_SEPARATOR, MIIM_BITMAP,
    MIIM_FTYPE, MIIM_ID, MIIM_STRING, MIIM_SUBMENU,
};

use crate::str::{U16CStrExt as _, to_wide_nul};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem<'a> {
    Separator,
    Command {
        text: &'a str,
        id: u32,
        /// Menu opened by the item. The parent menu takes ownership of it.
        submenu: Option<HMENU>,
        /// Image displayed next to the text. It must outlive the menu.
        bitmap: Option<HBITMAP>,
    },
}

/// Inserts `item` in `menu` before the item at the zero-based `position`.
///
/// A position past the last item appends the new item.
pub fn add_menu_item(menu: HMENU, position: u32, item: &MenuItem<'_>) -> anyhow::Result<()> {
    let mut info = MENUITEMINFOW {
        cbSize: u32::try_from(size_of::<MENUITEMINFOW>())?,
        ..Default::default()
    };

    // Kept alive until the item is inserted.
    let text;

    match *item {
        MenuItem::Separator => {
            info.fMask = MIIM_FTYPE;
            info.fType = MFT_SEPARATOR;
        }
        MenuItem::Command {
            text: item_text,
            id,
            submenu,
            bitmap,
        } => {
            text = to_wide_nul(item_text).context("menu text contains a NUL")?;

            info.fMask = MIIM_STRING | MIIM_ID;
            // The text is only read.
            info.dwTypeData = text.as_pwstr_unchecked();
            info.wID = id;

            if let Some(submenu) = submenu {
                info.fMask |= MIIM_SUBMENU;
                info.hSubMenu = submenu;
            }

            if let Some(bitmap) = bitmap {
                info.fMask |= MIIM_BITMAP;
                info.hbmpItem = bitmap;
            }
        }
    }

    // SAFETY: `info` is fully initialized and the text it points to is alive for the duration of the call.
    unsafe { InsertMenuItemW(menu, position, true, &info) }?;

    Ok(())
}

/// Finds the item whose command identifier is `command_id`.
///
/// Submenus are searched breadth-first when `search_submenus` is true. Returns the menu holding the
/// item and the zero-based position of the item in that menu.
///
/// Separators have a command identifier of zero and items opening a submenu have `u32::MAX`.
pub fn menu_item_position(menu: HMENU, command_id: u32, search_submenus: bool) -> Option<(HMENU, u32)> {
    let mut pending = VecDeque::from([menu]);

    while let Some(current) = pending.pop_front() {
        // SAFETY: FFI call with no outstanding precondition. An invalid handle gives -1.
        let count = unsafe { GetMenuItemCount(Some(current)) };

        for index in 0..count.max(0) {
            // SAFETY: FFI call with no outstanding precondition.
            if unsafe { GetMenuItemID(current, index) } == command_id {
                return u32::try_from(index).ok().map(|position| (current, position));
            }

            if search_submenus {
                // SAFETY: FFI call with no outstanding precondition.
                let submenu = unsafe { GetSubMenu(current, index) };

                if !submenu.is_invalid() {
                    pending.push_back(submenu);
                }
            }
        }
    }

    None
}
