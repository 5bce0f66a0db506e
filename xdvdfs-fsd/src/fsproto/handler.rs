use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dokan::{
    CreateFileInfo, DiskSpaceInfo, FileInfo, FileSystemHandler, FillDataError, FindData,
    OperationInfo, OperationResult, VolumeInfo, IO_SECURITY_CONTEXT,
};
use widestring::U16CStr;
use winapi::shared::ntstatus::{
    STATUS_ACCESS_DENIED, STATUS_FILE_IS_A_DIRECTORY, STATUS_IO_DEVICE_ERROR,
    STATUS_NOT_IMPLEMENTED, STATUS_OBJECT_NAME_COLLISION, STATUS_OBJECT_NAME_NOT_FOUND,
};
use winapi::um::winnt::{
    ACCESS_MASK, FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_READONLY, FILE_CREATE,
    FILE_NON_DIRECTORY_FILE, FILE_OPEN, FILE_OPEN_IF, FILE_OVERWRITE, FILE_OVERWRITE_IF,
    FILE_SUPERSEDE, FILE_WRITE_DATA,
};

use xdvdfs::read::EntryHandle;

use crate::container::Container;

/// Fixed serial number reported for every mounted volume. Not derived from
/// the image; Dokan callers only need a stable value.
pub const VOLUME_SERIAL_NUMBER: u32 = 0x1111_5555;
pub const FILESYSTEM_NAME: &str = "Dokan XISO";
const MAX_COMPONENT_LENGTH: u32 = 255;

/// Windows FILETIME epoch (1601-01-01) to Unix epoch (1970-01-01), in
/// 100ns ticks.
const FILETIME_UNIX_EPOCH_DIFFERENCE_100NS: u64 = 116_444_736_000_000_000;

fn filetime_to_system_time(ticks: u64) -> SystemTime {
    let unix_ticks = ticks.saturating_sub(FILETIME_UNIX_EPOCH_DIFFERENCE_100NS);
    UNIX_EPOCH + Duration::from_nanos(unix_ticks.saturating_mul(100))
}

#[derive(Clone, Copy)]
pub struct EntryContext {
    handle: EntryHandle,
}

/// Implements the Dokan callback surface against a [`Container`]. One
/// instance is constructed per mount and shared by every callback thread
/// Dokan dispatches to.
pub struct XdvdfsHandler {
    container: Arc<Container>,
    launch_after_mount: bool,
}

impl XdvdfsHandler {
    pub fn new(container: Arc<Container>, launch_after_mount: bool) -> Self {
        Self {
            container,
            launch_after_mount,
        }
    }

    fn attributes_for(&self, is_dir: bool) -> u32 {
        let mut attrs = FILE_ATTRIBUTE_READONLY;
        if is_dir {
            attrs |= FILE_ATTRIBUTE_DIRECTORY;
        }
        attrs
    }
}

/// Decides whether opening an *existing* entry under the given disposition
/// and access mask is allowed. `Ok(())` means the open proceeds; `Err` carries
/// the NTSTATUS `create_file` should return. Pure so the full disposition
/// table can be exercised without a live Dokan mount.
fn create_disposition_for_existing(
    is_dir: bool,
    desired_access: u32,
    create_disposition: u32,
    create_options: u32,
) -> Result<(), i32> {
    if is_dir && create_options & FILE_NON_DIRECTORY_FILE != 0 {
        return Err(STATUS_FILE_IS_A_DIRECTORY);
    }

    if desired_access & FILE_WRITE_DATA != 0 {
        return Err(STATUS_ACCESS_DENIED);
    }

    if is_dir && (create_disposition == FILE_CREATE || create_disposition == FILE_OPEN_IF) {
        return Err(STATUS_NOT_IMPLEMENTED);
    }

    if !is_dir
        && matches!(
            create_disposition,
            FILE_CREATE | FILE_OVERWRITE_IF | FILE_SUPERSEDE | FILE_OVERWRITE
        )
    {
        return Err(STATUS_ACCESS_DENIED);
    }

    if create_disposition == FILE_CREATE || create_disposition == FILE_OPEN_IF {
        return Err(STATUS_OBJECT_NAME_COLLISION);
    }

    Ok(())
}

/// NTSTATUS `create_file` should return when no entry exists at the
/// requested path. Every disposition is rejected: this filesystem never
/// creates files.
fn create_disposition_for_missing(create_disposition: u32) -> i32 {
    match create_disposition {
        FILE_OPEN => STATUS_OBJECT_NAME_NOT_FOUND,
        FILE_OPEN_IF => STATUS_NOT_IMPLEMENTED,
        FILE_CREATE | FILE_OVERWRITE_IF | FILE_SUPERSEDE | FILE_OVERWRITE => STATUS_ACCESS_DENIED,
        _ => STATUS_OBJECT_NAME_NOT_FOUND,
    }
}

impl<'c, 'h: 'c> FileSystemHandler<'c, 'h> for XdvdfsHandler {
    type Context = EntryContext;

    fn create_file(
        &'h self,
        file_name: &U16CStr,
        _security_context: &IO_SECURITY_CONTEXT,
        desired_access: ACCESS_MASK,
        _file_attributes: u32,
        _share_access: u32,
        create_disposition: u32,
        create_options: u32,
        _info: &mut OperationInfo<'c, 'h, Self>,
    ) -> OperationResult<CreateFileInfo<Self::Context>> {
        let path = file_name.to_string_lossy();
        log::debug!("create_file {path:?} disposition={create_disposition:#x}");

        match self.container.get_entry_by_path(&path) {
            Some((handle, entry)) => {
                let is_dir = entry.is_directory();
                create_disposition_for_existing(
                    is_dir,
                    desired_access as u32,
                    create_disposition,
                    create_options,
                )?;

                Ok(CreateFileInfo {
                    context: EntryContext { handle },
                    is_dir,
                    new_file_created: false,
                })
            }
            None => Err(create_disposition_for_missing(create_disposition)),
        }
    }

    fn read_file(
        &'h self,
        file_name: &U16CStr,
        offset: i64,
        buffer: &mut [u8],
        _info: &OperationInfo<'c, 'h, Self>,
        _context: &Self::Context,
    ) -> OperationResult<u32> {
        let path = file_name.to_string_lossy();

        let Some((_, entry)) = self.container.get_entry_by_path(&path) else {
            return Err(STATUS_OBJECT_NAME_NOT_FOUND);
        };

        if entry.is_directory() {
            return Ok(0);
        }

        self.container
            .read_file(entry, offset, buffer)
            .map(|n| n as u32)
            .map_err(|err| {
                log::warn!("read_file {path:?} failed: {err}");
                STATUS_IO_DEVICE_ERROR
            })
    }

    fn get_file_information(
        &'h self,
        file_name: &U16CStr,
        _info: &OperationInfo<'c, 'h, Self>,
        _context: &Self::Context,
    ) -> OperationResult<FileInfo> {
        let path = file_name.to_string_lossy();

        let Some((_, entry)) = self.container.get_entry_by_path(&path) else {
            return Err(STATUS_OBJECT_NAME_NOT_FOUND);
        };

        let modified = filetime_to_system_time(self.container.volume_modified());

        Ok(FileInfo {
            attributes: self.attributes_for(entry.is_directory()),
            creation_time: modified,
            last_access_time: modified,
            last_write_time: modified,
            file_size: entry.size as u64,
            number_of_links: 1,
            file_index: 0,
        })
    }

    fn find_files(
        &'h self,
        file_name: &U16CStr,
        mut fill_find_data: impl FnMut(&FindData) -> Result<(), FillDataError>,
        _info: &OperationInfo<'c, 'h, Self>,
        _context: &Self::Context,
    ) -> OperationResult<()> {
        let path = file_name.to_string_lossy();

        let Some(children) = self.container.list_directory(&path) else {
            return Err(STATUS_OBJECT_NAME_NOT_FOUND);
        };

        let modified = filetime_to_system_time(self.container.volume_modified());

        for handle in children {
            let Some(entry) = self.container.get_entry_by_handle(handle) else {
                continue;
            };

            if entry.name.chars().count() > MAX_COMPONENT_LENGTH as usize {
                log::warn!("skipping {:?}: name exceeds {MAX_COMPONENT_LENGTH} chars", entry.name);
                continue;
            }

            let Ok(file_name) = widestring::U16CString::from_str(&entry.name) else {
                continue;
            };

            let data = FindData {
                attributes: self.attributes_for(entry.is_directory()),
                creation_time: modified,
                last_access_time: modified,
                last_write_time: modified,
                file_size: entry.size as u64,
                file_name,
            };

            if let Err(err) = fill_find_data(&data) {
                if matches!(err, FillDataError::BufferFull) {
                    break;
                }
            }
        }

        Ok(())
    }

    fn get_disk_free_space(
        &'h self,
        _info: &OperationInfo<'c, 'h, Self>,
    ) -> OperationResult<DiskSpaceInfo> {
        Ok(DiskSpaceInfo {
            byte_count: self.container.volume_size(),
            free_byte_count: 0,
            available_byte_count: 0,
        })
    }

    fn get_volume_information(
        &'h self,
        _info: &OperationInfo<'c, 'h, Self>,
    ) -> OperationResult<VolumeInfo> {
        let volume_name = widestring::U16CString::from_str(self.container.volume_label())
            .unwrap_or_else(|_| widestring::U16CString::from_str("XISO").unwrap());
        let fs_name = widestring::U16CString::from_str(FILESYSTEM_NAME).unwrap();

        Ok(VolumeInfo {
            name: volume_name,
            serial_number: VOLUME_SERIAL_NUMBER,
            max_component_length: MAX_COMPONENT_LENGTH,
            fs_flags: dokan::FsFlags::CASE_SENSITIVE_SEARCH
                | dokan::FsFlags::CASE_PRESERVED_NAMES
                | dokan::FsFlags::UNICODE_ON_DISK
                | dokan::FsFlags::READ_ONLY_VOLUME,
            fs_name,
        })
    }

    fn mounted(
        &'h self,
        mount_point: &U16CStr,
        _info: &OperationInfo<'c, 'h, Self>,
    ) -> OperationResult<()> {
        log::info!("mounted at {}", mount_point.to_string_lossy());

        if self.launch_after_mount {
            if let Err(err) = std::process::Command::new("explorer.exe")
                .arg(mount_point.to_os_string())
                .spawn()
            {
                log::warn!("failed to launch file manager: {err}");
            }
        }

        Ok(())
    }
}
