//! Storage device and volume queries.
//!
//! The IOCTL output layouts are decoded from little-endian bytes. Offsets embedded in the
//! structures are checked against the buffer returned by the driver.

use crate::strings::widen_ansi;

/// Size of the fixed part of `STORAGE_DEVICE_DESCRIPTOR`, up to `RawDeviceProperties`.
pub const STORAGE_DEVICE_DESCRIPTOR_FIXED_LEN: usize = 36;

/// `size_of::<STORAGE_DEVICE_NUMBER>()`.
pub const STORAGE_DEVICE_NUMBER_LEN: usize = 12;

const DISK_EXTENTS_OFFSET: usize = 8;
const DISK_EXTENT_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("buffer is too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("{field} offset {offset} is outside of the {len}-byte buffer")]
    OffsetOutOfBounds {
        field: &'static str,
        offset: usize,
        len: usize,
    },
}

/// `STORAGE_BUS_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusType {
    Unknown,
    Scsi,
    Atapi,
    Ata,
    Ieee1394,
    Ssa,
    Fibre,
    Usb,
    Raid,
    Iscsi,
    Sas,
    Sata,
    Sd,
    Mmc,
    Virtual,
    FileBackedVirtual,
    Spaces,
    Nvme,
    Scm,
    Ufs,
    Nvmeof,
    Other(u32),
}

impl From<u32> for BusType {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::Scsi,
            2 => Self::Atapi,
            3 => Self::Ata,
            4 => Self::Ieee1394,
            5 => Self::Ssa,
            6 => Self::Fibre,
            7 => Self::Usb,
            8 => Self::Raid,
            9 => Self::Iscsi,
            10 => Self::Sas,
            11 => Self::Sata,
            12 => Self::Sd,
            13 => Self::Mmc,
            14 => Self::Virtual,
            15 => Self::FileBackedVirtual,
            16 => Self::Spaces,
            17 => Self::Nvme,
            18 => Self::Scm,
            19 => Self::Ufs,
            20 => Self::Nvmeof,
            other => Self::Other(other),
        }
    }
}

/// Decoded `STORAGE_DEVICE_DESCRIPTOR`, as returned by `IOCTL_STORAGE_QUERY_PROPERTY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDeviceDescriptor {
    version: u32,
    size: u32,
    device_type: u8,
    device_type_modifier: u8,
    removable_media: bool,
    command_queueing: bool,
    bus_type: BusType,
    vendor_id: Option<String>,
    product_id: Option<String>,
    product_revision: Option<String>,
    serial_number: Option<String>,
    raw_device_properties: Vec<u8>,
}

impl StorageDeviceDescriptor {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        ensure_len(bytes, STORAGE_DEVICE_DESCRIPTOR_FIXED_LEN)?;

        let raw_len = to_usize(read_u32(bytes, 32));
        let raw_device_properties = bytes
            .get(STORAGE_DEVICE_DESCRIPTOR_FIXED_LEN..)
            .and_then(|raw| raw.get(..raw_len))
            .ok_or(DescriptorError::Truncated {
                expected: STORAGE_DEVICE_DESCRIPTOR_FIXED_LEN.saturating_add(raw_len),
                actual: bytes.len(),
            })?
            .to_vec();

        Ok(Self {
            version: read_u32(bytes, 0),
            size: read_u32(bytes, 4),
            device_type: bytes[8],
            device_type_modifier: bytes[9],
            removable_media: bytes[10] != 0,
            command_queueing: bytes[11] != 0,
            vendor_id: read_ansi_at(bytes, "VendorId", read_u32(bytes, 12))?,
            product_id: read_ansi_at(bytes, "ProductId", read_u32(bytes, 16))?,
            product_revision: read_ansi_at(bytes, "ProductRevision", read_u32(bytes, 20))?,
            serial_number: read_ansi_at(bytes, "SerialNumber", read_u32(bytes, 24))?,
            bus_type: BusType::from(read_u32(bytes, 28)),
            raw_device_properties,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Total size of the descriptor reported by the driver, strings included.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// SCSI peripheral device type.
    pub fn device_type(&self) -> u8 {
        self.device_type
    }

    pub fn device_type_modifier(&self) -> u8 {
        self.device_type_modifier
    }

    pub fn removable_media(&self) -> bool {
        self.removable_media
    }

    pub fn command_queueing(&self) -> bool {
        self.command_queueing
    }

    pub fn bus_type(&self) -> BusType {
        self.bus_type
    }

    pub fn vendor_id(&self) -> Option<&str> {
        self.vendor_id.as_deref()
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    pub fn product_revision(&self) -> Option<&str> {
        self.product_revision.as_deref()
    }

    /// Serial number as stored by the driver.
    ///
    /// Some ATA drivers report it with the bytes of each character pair swapped, it is not corrected here.
    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    pub fn raw_device_properties(&self) -> &[u8] {
        &self.raw_device_properties
    }
}

/// Decoded `STORAGE_DEVICE_NUMBER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageDeviceNumber {
    pub device_type: u32,
    pub device_number: u32,
    /// Partition number, or `u32::MAX` for devices that cannot be partitioned.
    pub partition_number: u32,
}

impl StorageDeviceNumber {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        ensure_len(bytes, STORAGE_DEVICE_NUMBER_LEN)?;

        Ok(Self {
            device_type: read_u32(bytes, 0),
            device_number: read_u32(bytes, 4),
            partition_number: read_u32(bytes, 8),
        })
    }
}

/// `DISK_EXTENT`: a contiguous range of a physical disk backing a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskExtent {
    pub disk_number: u32,
    pub starting_offset: i64,
    pub extent_length: i64,
}

/// Decoded `VOLUME_DISK_EXTENTS`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeDiskExtents {
    extents: Vec<DiskExtent>,
}

impl VolumeDiskExtents {
    /// Size of a `VOLUME_DISK_EXTENTS` buffer able to hold `extent_count` extents.
    ///
    /// The structure always has room for at least one extent.
    pub fn required_size(extent_count: u32) -> Option<usize> {
        to_usize(extent_count.max(1))
            .checked_mul(DISK_EXTENT_LEN)?
            .checked_add(DISK_EXTENTS_OFFSET)
    }

    /// `NumberOfDiskExtents`, which the driver fills in even when the buffer is too small.
    pub fn extent_count(bytes: &[u8]) -> Result<u32, DescriptorError> {
        ensure_len(bytes, 4)?;
        Ok(read_u32(bytes, 0))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let count = Self::extent_count(bytes)?;
        let truncated = || DescriptorError::Truncated {
            expected: Self::required_size(count).unwrap_or(usize::MAX),
            actual: bytes.len(),
        };

        let extents = (0..to_usize(count))
            .map(|idx| {
                let offset = idx
                    .checked_mul(DISK_EXTENT_LEN)
                    .and_then(|offset| offset.checked_add(DISK_EXTENTS_OFFSET))
                    .ok_or_else(truncated)?;

                let extent = bytes
                    .get(offset..)
                    .and_then(|extent| extent.get(..DISK_EXTENT_LEN))
                    .ok_or_else(truncated)?;

                // DiskNumber is followed by 4 bytes of padding.
                Ok(DiskExtent {
                    disk_number: read_u32(extent, 0),
                    starting_offset: read_i64(extent, 8),
                    extent_length: read_i64(extent, 16),
                })
            })
            .collect::<Result<Vec<_>, DescriptorError>>()?;

        Ok(Self { extents })
    }

    pub fn extents(&self) -> &[DiskExtent] {
        &self.extents
    }

    pub fn into_extents(self) -> Vec<DiskExtent> {
        self.extents
    }
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<(), DescriptorError> {
    if bytes.len() < expected {
        return Err(DescriptorError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }

    Ok(())
}

/// Reads the NUL-terminated ANSI string at `offset`. An offset of zero means the field is absent.
fn read_ansi_at(bytes: &[u8], field: &'static str, offset: u32) -> Result<Option<String>, DescriptorError> {
    if offset == 0 {
        return Ok(None);
    }

    let offset = to_usize(offset);
    let tail = bytes.get(offset..).ok_or(DescriptorError::OffsetOutOfBounds {
        field,
        offset,
        len: bytes.len(),
    })?;

    Ok(Some(widen_ansi(crate::str::nul_slice_str(tail))))
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut raw = [0; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_le_bytes(raw)
}

#[cfg(target_os = "windows")]
pub use self::win_ext::*;

#[cfg(target_os = "windows")]
mod win_ext {
    use core::ffi::c_void;

    use anyhow::Context as _;
    use windows::Win32::Foundation::{E_INVALIDARG, ERROR_MORE_DATA, GENERIC_READ, HANDLE, MAX_PATH};
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_FLAGS_AND_ATTRIBUTES, FILE_SHARE_READ, FILE_SHARE_WRITE, GetVolumeNameForVolumeMountPointW,
        GetVolumePathNameW, IOCTL_VOLUME_GET_VOLUME_DISK_EXTENTS, OPEN_EXISTING,
    };
    use windows::Win32::System::IO::DeviceIoControl;
    use windows::Win32::System::Ioctl::{
        FILE_FS_PERSISTENT_VOLUME_INFORMATION, FSCTL_QUERY_PERSISTENT_VOLUME_STATE, IOCTL_STORAGE_GET_DEVICE_NUMBER,
        IOCTL_STORAGE_QUERY_PROPERTY, PERSISTENT_VOLUME_STATE_SHORT_NAME_CREATION_DISABLED, PropertyStandardQuery, STORAGE_DESCRIPTOR_HEADER,
        STORAGE_PROPERTY_QUERY, StorageDeviceProperty,
    };
    use windows::core::{HRESULT, Owned};

    use super::{STORAGE_DEVICE_NUMBER_LEN, StorageDeviceDescriptor, StorageDeviceNumber, VolumeDiskExtents};
    use crate::Error;
    use crate::str::{U16CStrExt as _, nul_slice_wide_str, to_wide_nul};

    /// Opens `device_name` (`\\.\PhysicalDrive0`, `\\.\C:`, a device interface path...) for IOCTL queries.
    fn open_device(device_name: &str, desired_access: u32) -> anyhow::Result<Owned<HANDLE>> {
        let device_name_wide = to_wide_nul(device_name).context("device name contains a NUL")?;

        // SAFETY: `device_name_wide` is a valid NUL-terminated string. The handle is closed by `Owned`.
        let handle = unsafe {
            CreateFileW(
                device_name_wide.as_pcwstr(),
                desired_access,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                None,
                OPEN_EXISTING,
                FILE_FLAGS_AND_ATTRIBUTES(0),
                None,
            )
        }
        .with_context(|| format!("failed to open {device_name}"))?;

        // SAFETY: `CreateFileW` succeeded, the handle is valid and owned by us.
        Ok(unsafe { Owned::new(handle) })
    }

    fn buffer_len(len: usize) -> windows::core::Result<u32> {
        u32::try_from(len).map_err(|_| windows::core::Error::from(E_INVALIDARG))
    }

    /// A fixed-size output is only usable when the driver filled all of it.
    fn check_output_len(returned: u32, expected: u32) -> Result<(), Error> {
        if returned < expected {
            return Err(Error::InvalidData("driver returned a truncated output structure"));
        }

        Ok(())
    }

    /// Sends `code` with an optional typed input, and reads the output into `output`.
    ///
    /// Returns the number of bytes written by the driver.
    fn control_into_bytes<I>(
        device: HANDLE,
        code: u32,
        input: Option<&I>,
        output: &mut [u8],
    ) -> windows::core::Result<usize> {
        let input_len = if input.is_some() { buffer_len(size_of::<I>())? } else { 0 };
        let output_len = buffer_len(output.len())?;
        let mut returned = 0u32;

        // SAFETY: `input` points to `input_len` readable bytes when present and `output` is
        // `output_len` bytes long. The operation is synchronous.
        unsafe {
            DeviceIoControl(
                device,
                code,
                input.map(|input| core::ptr::from_ref(input).cast::<c_void>()),
                input_len,
                Some(output.as_mut_ptr().cast::<c_void>()),
                output_len,
                Some(&mut returned),
                None,
            )
        }?;

        Ok(usize::try_from(returned).unwrap_or(output.len()).min(output.len()))
    }

    /// Sends `code` and reads a fixed-size output structure.
    fn control_into<I, O: Default>(device: HANDLE, code: u32, input: Option<&I>) -> Result<O, Error> {
        let input_len = if input.is_some() { buffer_len(size_of::<I>())? } else { 0 };
        let output_len = buffer_len(size_of::<O>())?;
        let mut output = O::default();
        let mut returned = 0u32;

        // SAFETY: `input` points to `input_len` readable bytes when present, `output` is a valid `O`
        // and `returned` is valid for writes. The operation is synchronous.
        unsafe {
            DeviceIoControl(
                device,
                code,
                input.map(|input| core::ptr::from_ref(input).cast::<c_void>()),
                input_len,
                Some(core::ptr::from_mut(&mut output).cast::<c_void>()),
                output_len,
                Some(&mut returned),
                None,
            )
        }?;

        check_output_len(returned, output_len)?;

        Ok(output)
    }

    impl StorageDeviceDescriptor {
        /// Queries the standard device property of `device_name`.
        pub fn query(device_name: &str) -> anyhow::Result<Self> {
            let device = open_device(device_name, 0)?;

            let query = STORAGE_PROPERTY_QUERY {
                PropertyId: StorageDeviceProperty,
                QueryType: PropertyStandardQuery,
                ..Default::default()
            };

            let header: STORAGE_DESCRIPTOR_HEADER = control_into(*device, IOCTL_STORAGE_QUERY_PROPERTY, Some(&query))
                .context("failed to query the storage descriptor size")?;

            let mut buffer = vec![0u8; usize::try_from(header.Size)?];
            let written = control_into_bytes(*device, IOCTL_STORAGE_QUERY_PROPERTY, Some(&query), &mut buffer)
                .context("failed to query the storage descriptor")?;
            buffer.truncate(written);

            Ok(Self::from_bytes(&buffer)?)
        }
    }

    impl StorageDeviceNumber {
        pub fn query(device_name: &str) -> anyhow::Result<Self> {
            let device = open_device(device_name, 0)?;

            let mut buffer = [0u8; STORAGE_DEVICE_NUMBER_LEN];
            let written = control_into_bytes::<()>(*device, IOCTL_STORAGE_GET_DEVICE_NUMBER, None, &mut buffer)
                .context("failed to query the storage device number")?;

            Ok(Self::from_bytes(&buffer[..written])?)
        }
    }

    impl VolumeDiskExtents {
        /// Queries the physical disk extents backing the volume `device_name` (e.g.: `\\.\C:`).
        pub fn query(device_name: &str) -> anyhow::Result<Self> {
            let device = open_device(device_name, 0)?;

            let mut buffer = vec![0u8; Self::required_size(1).context("extent buffer size overflow")?];

            let written = match control_into_bytes::<()>(*device, IOCTL_VOLUME_GET_VOLUME_DISK_EXTENTS, None, &mut buffer)
            {
                Ok(written) => written,
                Err(error) if error.code() == HRESULT::from_win32(ERROR_MORE_DATA.0) => {
                    let count = Self::extent_count(&buffer)?;
                    buffer.resize(Self::required_size(count).context("extent buffer size overflow")?, 0);

                    control_into_bytes::<()>(*device, IOCTL_VOLUME_GET_VOLUME_DISK_EXTENTS, None, &mut buffer)
                        .context("failed to query the volume disk extents")?
                }
                Err(error) => return Err(anyhow::Error::new(error).context("failed to query the volume disk extents")),
            };

            buffer.truncate(written);

            Ok(Self::from_bytes(&buffer)?)
        }
    }

    /// Returns the `\\?\Volume{GUID}\` path of the volume holding `path`.
    pub fn volume_guid_path(path: &str, trailing_backslash: bool) -> anyhow::Result<String> {
        let path_wide = to_wide_nul(path).context("path contains a NUL")?;
        let mut mount_point = [0u16; MAX_PATH as usize];

        // SAFETY: `path_wide` is NUL-terminated, and the output slice length is passed along with its pointer.
        unsafe { GetVolumePathNameW(path_wide.as_pcwstr(), &mut mount_point) }
            .with_context(|| format!("failed to get the volume mount point of {path}"))?;

        let mut volume_name = [0u16; MAX_PATH as usize];

        // SAFETY: `mount_point` was NUL-terminated by `GetVolumePathNameW`.
        unsafe { GetVolumeNameForVolumeMountPointW(windows::core::PCWSTR(mount_point.as_ptr()), &mut volume_name) }
            .with_context(|| format!("failed to get the volume name of {path}"))?;

        let mut volume_name = String::from_utf16(nul_slice_wide_str(&volume_name))?;

        if !trailing_backslash && volume_name.ends_with('\\') {
            volume_name.pop();
        }

        Ok(volume_name)
    }

    /// Reads the persistent `PERSISTENT_VOLUME_STATE_SHORT_NAME_CREATION_DISABLED` flag of the volume
    /// holding `path`.
    ///
    /// The returned value is `VolumeFlags` masked to that flag: non-zero when 8.3 names are disabled.
    /// Opening a volume requires administrator rights.
    pub fn short_name_creation_state(path: &str) -> anyhow::Result<u32> {
        let volume = volume_guid_path(path, false)?;
        let device = open_device(&volume, GENERIC_READ.0)?;

        let query = FILE_FS_PERSISTENT_VOLUME_INFORMATION {
            FlagMask: PERSISTENT_VOLUME_STATE_SHORT_NAME_CREATION_DISABLED,
            Version: 1,
            ..Default::default()
        };

        let state: FILE_FS_PERSISTENT_VOLUME_INFORMATION =
            control_into(*device, FSCTL_QUERY_PERSISTENT_VOLUME_STATE, Some(&query))
                .with_context(|| format!("failed to query the persistent state of {volume}"))?;

        Ok(state.VolumeFlags)
    }

}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    struct DescriptorBuilder {
        bytes: Vec<u8>,
    }

    impl DescriptorBuilder {
        fn new(bus_type: u32, raw_properties: &[u8]) -> Self {
            let mut bytes = vec![0u8; STORAGE_DEVICE_DESCRIPTOR_FIXED_LEN];
            bytes[0..4].copy_from_slice(&1u32.to_le_bytes());
            bytes[8] = 0x00;
            bytes[9] = 0x02;
            bytes[10] = 1;
            bytes[11] = 0;
            bytes[28..32].copy_from_slice(&bus_type.to_le_bytes());
            bytes[32..36].copy_from_slice(&u32::try_from(raw_properties.len()).expect("small").to_le_bytes());
            bytes.extend_from_slice(raw_properties);
            Self { bytes }
        }

        fn string(mut self, field_offset: usize, value: &[u8]) -> Self {
            let offset = u32::try_from(self.bytes.len()).expect("small");
            self.bytes[field_offset..field_offset + 4].copy_from_slice(&offset.to_le_bytes());
            self.bytes.extend_from_slice(value);
            self.bytes.push(0);
            self
        }

        fn build(mut self) -> Vec<u8> {
            let size = u32::try_from(self.bytes.len()).expect("small");
            self.bytes[4..8].copy_from_slice(&size.to_le_bytes());
            self.bytes
        }
    }

    #[test]
    fn decodes_descriptor() {
        let bytes = DescriptorBuilder::new(7, &[0xDE, 0xAD])
            .string(12, b"Generic")
            .string(16, b"Flash Disk")
            .string(20, b"8.07")
            .string(24, b"\xb5SN-42")
            .build();

        let descriptor = StorageDeviceDescriptor::from_bytes(&bytes).expect("valid descriptor");

        assert_eq!(descriptor.version(), 1);
        assert_eq!(descriptor.size(), u32::try_from(bytes.len()).expect("small"));
        assert_eq!(descriptor.device_type(), 0);
        assert_eq!(descriptor.device_type_modifier(), 2);
        assert!(descriptor.removable_media());
        assert!(!descriptor.command_queueing());
        assert_eq!(descriptor.bus_type(), BusType::Usb);
        assert_eq!(descriptor.vendor_id(), Some("Generic"));
        assert_eq!(descriptor.product_id(), Some("Flash Disk"));
        assert_eq!(descriptor.product_revision(), Some("8.07"));
        assert_eq!(descriptor.serial_number(), Some("µSN-42"));
        assert_eq!(descriptor.raw_device_properties(), [0xDE, 0xAD]);
    }

    #[test]
    fn zero_offsets_are_absent_strings() {
        let bytes = DescriptorBuilder::new(17, &[]).string(16, b"NVMe SSD").build();

        let descriptor = StorageDeviceDescriptor::from_bytes(&bytes).expect("valid descriptor");

        assert_eq!(descriptor.bus_type(), BusType::Nvme);
        assert_eq!(descriptor.vendor_id(), None);
        assert_eq!(descriptor.product_id(), Some("NVMe SSD"));
        assert_eq!(descriptor.serial_number(), None);
        assert!(descriptor.raw_device_properties().is_empty());
    }

    #[test]
    fn unterminated_string_stops_at_buffer_end() {
        let mut bytes = DescriptorBuilder::new(11, &[]).string(12, b"ATA").build();
        bytes.pop();

        let descriptor = StorageDeviceDescriptor::from_bytes(&bytes).expect("valid descriptor");
        assert_eq!(descriptor.vendor_id(), Some("ATA"));
    }

    #[test]
    fn rejects_string_offset_past_end() {
        let mut bytes = DescriptorBuilder::new(11, &[]).build();
        bytes[20..24].copy_from_slice(&100u32.to_le_bytes());

        assert_eq!(
            StorageDeviceDescriptor::from_bytes(&bytes),
            Err(DescriptorError::OffsetOutOfBounds {
                field: "ProductRevision",
                offset: 100,
                len: 36
            })
        );
    }

    #[test]
    fn rejects_truncated_descriptor() {
        assert_eq!(
            StorageDeviceDescriptor::from_bytes(&[0; 8]),
            Err(DescriptorError::Truncated { expected: 36, actual: 8 })
        );

        let mut bytes = DescriptorBuilder::new(0, &[1, 2, 3]).build();
        bytes.truncate(37);

        assert_eq!(
            StorageDeviceDescriptor::from_bytes(&bytes),
            Err(DescriptorError::Truncated { expected: 39, actual: 37 })
        );
    }

    #[rstest]
    #[case(0, BusType::Unknown)]
    #[case(4, BusType::Ieee1394)]
    #[case(9, BusType::Iscsi)]
    #[case(15, BusType::FileBackedVirtual)]
    #[case(20, BusType::Nvmeof)]
    #[case(21, BusType::Other(21))]
    #[case(0x7F, BusType::Other(0x7F))]
    fn maps_bus_types(#[case] raw: u32, #[case] expected: BusType) {
        assert_eq!(BusType::from(raw), expected);
    }

    #[test]
    fn decodes_device_number() {
        let mut bytes = Vec::new();
        for value in [7u32, 1, u32::MAX] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        assert_eq!(
            StorageDeviceNumber::from_bytes(&bytes),
            Ok(StorageDeviceNumber {
                device_type: 7,
                device_number: 1,
                partition_number: u32::MAX,
            })
        );

        assert_eq!(
            StorageDeviceNumber::from_bytes(&bytes[..8]),
            Err(DescriptorError::Truncated { expected: 12, actual: 8 })
        );
    }

    fn extents_buffer(count: u32, extents: &[(u32, i64, i64)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(&[0; 4]);

        for &(disk_number, starting_offset, extent_length) in extents {
            bytes.extend_from_slice(&disk_number.to_le_bytes());
            bytes.extend_from_slice(&[0xCC; 4]);
            bytes.extend_from_slice(&starting_offset.to_le_bytes());
            bytes.extend_from_slice(&extent_length.to_le_bytes());
        }

        bytes
    }

    #[test]
    fn decodes_disk_extents() {
        let bytes = extents_buffer(2, &[(0, 1_048_576, 511_101_108_224), (3, 16_777_216, 1_000_000)]);

        let extents = VolumeDiskExtents::from_bytes(&bytes).expect("valid extents");

        assert_eq!(
            extents.into_extents(),
            [
                DiskExtent {
                    disk_number: 0,
                    starting_offset: 1_048_576,
                    extent_length: 511_101_108_224,
                },
                DiskExtent {
                    disk_number: 3,
                    starting_offset: 16_777_216,
                    extent_length: 1_000_000,
                },
            ]
        );
    }

    #[test]
    fn reports_missing_extents() {
        let bytes = extents_buffer(3, &[(0, 0, 512)]);

        assert_eq!(VolumeDiskExtents::extent_count(&bytes), Ok(3));
        assert_eq!(
            VolumeDiskExtents::from_bytes(&bytes),
            Err(DescriptorError::Truncated { expected: 80, actual: 32 })
        );
    }

    #[test]
    fn zero_extents() {
        let extents = VolumeDiskExtents::from_bytes(&extents_buffer(0, &[])).expect("valid extents");
        assert!(extents.extents().is_empty());
    }

    #[rstest]
    #[case(0, 32)]
    #[case(1, 32)]
    #[case(2, 56)]
    #[case(4, 104)]
    fn computes_required_size(#[case] count: u32, #[case] expected: usize) {
        assert_eq!(VolumeDiskExtents::required_size(count), Some(expected));
    }

    #[cfg(target_os = "windows")]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn queries_system_volume() {
        let extents = VolumeDiskExtents::query(r"\\.\C:").expect("system volume extents");
        assert!(!extents.extents().is_empty());

        let disk = format!(r"\\.\PhysicalDrive{}", extents.extents()[0].disk_number);

        let number = StorageDeviceNumber::query(&disk).expect("disk device number");
        assert_eq!(number.device_number, extents.extents()[0].disk_number);

        let descriptor = StorageDeviceDescriptor::query(&disk).expect("disk descriptor");
        assert!(descriptor.size() >= 36);
    }

    #[cfg(target_os = "windows")]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn resolves_volume_guid_path() {
        let with_backslash = volume_guid_path(r"C:\Windows", true).expect("volume GUID path");
        assert!(with_backslash.starts_with(r"\\?\Volume{"));
        assert!(with_backslash.ends_with('\\'));

        let without_backslash = volume_guid_path(r"C:\Windows", false).expect("volume GUID path");
        assert_eq!(format!("{without_backslash}\\"), with_backslash);
    }
}
