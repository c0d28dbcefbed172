use core::mem::offset_of;

use anyhow::Context as _;
use tracing::{debug, warn};
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    HDEVINFO, SETUP_DI_GET_CLASS_DEVS_FLAGS, SP_DEVICE_INTERFACE_DATA, SP_DEVICE_INTERFACE_DETAIL_DATA_W,
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInterfaces, SetupDiGetClassDevsW, SetupDiGetDeviceInterfaceDetailW,
};
use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, ERROR_NO_MORE_ITEMS, HWND};
use windows::core::{GUID, PCWSTR};

use crate::Error;
use crate::raw_buffer::RawBuffer;
use crate::storage::StorageDeviceNumber;
use crate::str::{U16CStrExt as _, nul_slice_wide_str, to_wide_nul};

/// A SetupAPI device information set, destroyed on drop.
pub struct DeviceInformationSet {
    handle: HDEVINFO,
    class_guid: Option<GUID>,
    enumerator: Option<String>,
    parent: Option<HWND>,
    flags: SETUP_DI_GET_CLASS_DEVS_FLAGS,
}

impl DeviceInformationSet {
    /// Builds the set of devices matching `class_guid`, `enumerator` and `flags` with `SetupDiGetClassDevsW`.
    ///
    /// Listing device interfaces with [`DeviceInformationSet::device_paths`] requires `class_guid` to be a
    /// device interface class and `flags` to include `DIGCF_DEVICEINTERFACE`.
    pub fn new(
        class_guid: Option<&GUID>,
        enumerator: Option<&str>,
        parent: Option<HWND>,
        flags: SETUP_DI_GET_CLASS_DEVS_FLAGS,
    ) -> anyhow::Result<Self> {
        let enumerator_wide = enumerator
            .map(to_wide_nul)
            .transpose()
            .context("enumerator contains a NUL")?;

        let enumerator_ptr = enumerator_wide.as_ref().map_or(PCWSTR::null(), |e| e.as_pcwstr());

        // SAFETY: The class GUID and the enumerator, when present, are valid for the duration of the call.
        let handle = unsafe { SetupDiGetClassDevsW(class_guid.map(core::ptr::from_ref), enumerator_ptr, parent, flags) }
            .context("SetupDiGetClassDevsW failed")?;

        Ok(Self {
            handle,
            class_guid: class_guid.copied(),
            enumerator: enumerator.map(str::to_owned),
            parent,
            flags,
        })
    }

    pub fn handle(&self) -> HDEVINFO {
        self.handle
    }

    pub fn class_guid(&self) -> Option<&GUID> {
        self.class_guid.as_ref()
    }

    pub fn enumerator(&self) -> Option<&str> {
        self.enumerator.as_deref()
    }

    pub fn parent(&self) -> Option<HWND> {
        self.parent
    }

    pub fn flags(&self) -> SETUP_DI_GET_CLASS_DEVS_FLAGS {
        self.flags
    }

    /// Returns the path of every device interface of the set, usable with `CreateFileW`.
    pub fn device_paths(&self) -> anyhow::Result<Vec<String>> {
        let class_guid = self
            .class_guid
            .as_ref()
            .ok_or(Error::InvalidData("a device interface class is required to list device interfaces"))?;

        debug!(?class_guid, enumerator = ?self.enumerator, "Enumerating device interfaces");

        let mut paths = Vec::new();

        for index in 0u32.. {
            let mut interface = SP_DEVICE_INTERFACE_DATA {
                cbSize: u32::try_from(size_of::<SP_DEVICE_INTERFACE_DATA>())?,
                ..Default::default()
            };

            // SAFETY: `class_guid` and `interface` are valid, and `interface.cbSize` is set.
            match unsafe { SetupDiEnumDeviceInterfaces(self.handle, None, class_guid, index, &mut interface) } {
                Ok(()) => {}
                Err(error) if error.code() == ERROR_NO_MORE_ITEMS.to_hresult() => break,
                Err(error) => return Err(anyhow::Error::new(error).context("SetupDiEnumDeviceInterfaces failed")),
            }

            paths.push(self.interface_path(&interface)?);
        }

        Ok(paths)
    }

    fn interface_path(&self, interface: &SP_DEVICE_INTERFACE_DATA) -> anyhow::Result<String> {
        let mut required_size = 0u32;

        // SAFETY: `interface` was filled by `SetupDiEnumDeviceInterfaces`. Only the required size is queried.
        match unsafe { SetupDiGetDeviceInterfaceDetailW(self.handle, interface, None, 0, Some(&mut required_size), None) } {
            Err(error) if error.code() == ERROR_INSUFFICIENT_BUFFER.to_hresult() => {}
            Err(error) => return Err(anyhow::Error::new(error).context("failed to query the interface detail size")),
            Ok(()) => anyhow::bail!(Error::InvalidData("interface detail size query unexpectedly succeeded")),
        }

        let buffer_size = usize::try_from(required_size)?.max(size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>());
        let mut buffer = RawBuffer::alloc_zeroed_for::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>(buffer_size)?;

        // `cbSize` is the size of the fixed part of the structure, not the size of the buffer.
        let cb_size = u32::try_from(size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>())?;
        buffer.as_mut_slice()[..4].copy_from_slice(&cb_size.to_ne_bytes());

        // SAFETY: The buffer is aligned for `SP_DEVICE_INTERFACE_DETAIL_DATA_W`, at least `required_size`
        // bytes long, and `cbSize` is set.
        unsafe {
            SetupDiGetDeviceInterfaceDetailW(
                self.handle,
                interface,
                Some(buffer.as_mut_ptr_cast::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>()),
                u32::try_from(buffer.len())?,
                None,
                None,
            )
        }
        .context("failed to read the interface detail")?;

        let path: Vec<u16> = buffer.as_slice()[offset_of!(SP_DEVICE_INTERFACE_DETAIL_DATA_W, DevicePath)..]
            .chunks_exact(2)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
            .collect();

        Ok(String::from_utf16(nul_slice_wide_str(&path))?)
    }

    /// Returns the interface path of the physical device backing `device_name` (e.g.: `\\.\C:` or
    /// `\\.\PhysicalDrive0`), matched by storage device number.
    ///
    /// Interfaces that cannot be queried are skipped.
    pub fn device_path_for(&self, device_name: &str) -> anyhow::Result<Option<String>> {
        let target = StorageDeviceNumber::query(device_name)?;

        for path in self.device_paths()? {
            match StorageDeviceNumber::query(&path) {
                Ok(number) if number.device_type == target.device_type && number.device_number == target.device_number => {
                    return Ok(Some(path));
                }
                Ok(_) => {}
                Err(error) => debug!(%path, error = format!("{error:#}"), "Skipping device interface"),
            }
        }

        Ok(None)
    }
}

impl Drop for DeviceInformationSet {
    fn drop(&mut self) {
        // SAFETY: The set was created by `SetupDiGetClassDevsW` and is destroyed once.
        if let Err(error) = unsafe { SetupDiDestroyDeviceInfoList(self.handle) } {
            warn!(%error, "Failed to destroy device information set");
        }
    }
}
