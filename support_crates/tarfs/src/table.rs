use crate::header::TarHeader;
use crate::{
    align_up, BlockDevice, FsError, DISK_SECTORS, DISK_SIZE, FILES_MAX, FILE_CAPACITY, NAME_LEN,
    SECTOR_SIZE,
};
use core::fmt::{Debug, Formatter};

/// An entry of the [`FileTable`]
pub struct File {
    in_use: bool,
    name: [u8; NAME_LEN],
    name_len: usize,
    data: [u8; FILE_CAPACITY],
    size: usize,
}

impl File {
    const fn empty() -> Self {
        Self {
            in_use: false,
            name: [0; NAME_LEN],
            name_len: 0,
            data: [0; FILE_CAPACITY],
            size: 0,
        }
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len]
    }

    /// The current content of the file
    pub fn data(&self) -> &[u8] {
        &self.data[..self.size]
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Replace the content of the file with `data`
    pub fn set_data(&mut self, data: &[u8]) -> Result<(), FsError> {
        if data.len() > FILE_CAPACITY {
            return Err(FsError::TooLarge { size: data.len() });
        }
        self.data[..data.len()].copy_from_slice(data);
        self.data[data.len()..].fill(0);
        self.size = data.len();
        Ok(())
    }

    fn claim(&mut self, name: &[u8]) {
        *self = Self::empty();
        self.in_use = true;
        self.name[..name.len()].copy_from_slice(name);
        self.name_len = name.len();
    }
}

const EMPTY_FILE: File = File::empty();

impl Debug for File {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("File")
            .field("in_use", &self.in_use)
            .field(
                "name",
                &core::str::from_utf8(self.name()).unwrap_or("<binary>"),
            )
            .field("size", &self.size)
            .finish()
    }
}

/// A fixed capacity table of named in-memory files backed by a tar image
pub struct FileTable {
    files: [File; FILES_MAX],
    /// Scratch space holding the archive image during `load()` and `flush()`
    disk: [u8; DISK_SIZE],
}

fn check_name(name: &[u8]) -> Result<(), FsError> {
    if name.is_empty() || name.len() > NAME_LEN || name.contains(&0) {
        return Err(FsError::InvalidName);
    }
    Ok(())
}

impl FileTable {
    pub const fn new() -> Self {
        Self {
            files: [EMPTY_FILE; FILES_MAX],
            disk: [0; DISK_SIZE],
        }
    }

    /// Iterate over all files that are currently in use
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.iter().filter(|file| file.in_use)
    }

    /// Find the file named exactly `name`
    pub fn lookup(&self, name: &[u8]) -> Option<&File> {
        self.files().find(|file| file.name() == name)
    }

    fn lookup_index(&self, name: &[u8]) -> Option<usize> {
        self.files
            .iter()
            .position(|file| file.in_use && file.name() == name)
    }

    /// Return the file named `name`, creating an empty one if it does not exist yet
    pub fn find_or_create(&mut self, name: &[u8]) -> Result<&mut File, FsError> {
        let idx = self.find_or_create_index(name)?;
        Ok(&mut self.files[idx])
    }

    fn find_or_create_index(&mut self, name: &[u8]) -> Result<usize, FsError> {
        check_name(name)?;
        if let Some(idx) = self.lookup_index(name) {
            return Ok(idx);
        }
        let idx = self
            .files
            .iter()
            .position(|file| !file.in_use)
            .ok_or(FsError::TableFull)?;
        self.files[idx].claim(name);
        Ok(idx)
    }

    /// Copy the beginning of file `name` into `buf` and return how many bytes were copied
    pub fn read(&self, name: &[u8], buf: &mut [u8]) -> Result<usize, FsError> {
        let file = self.lookup(name).ok_or(FsError::NotFound)?;
        let len = file.size.min(buf.len());
        buf[..len].copy_from_slice(&file.data[..len]);
        Ok(len)
    }

    /// Replace the content of file `name` with `data`, creating the file if necessary.
    ///
    /// The table is left unchanged if `data` does not fit into a file.
    pub fn write(&mut self, name: &[u8], data: &[u8]) -> Result<usize, FsError> {
        if data.len() > FILE_CAPACITY {
            return Err(FsError::TooLarge { size: data.len() });
        }
        self.find_or_create(name)?.set_data(data)?;
        Ok(data.len())
    }

    /// Replace the content of the table with the files stored in the tar image on `dev`.
    ///
    /// Files that do not fit into the table are skipped.
    /// Parsing stops at a malformed header in which case the files loaded until then are kept.
    /// On success, the number of loaded files is returned.
    pub fn load(&mut self, dev: &mut (impl BlockDevice + ?Sized)) -> Result<usize, FsError> {
        self.files = [EMPTY_FILE; FILES_MAX];
        self.disk.fill(0);

        let sectors = (dev.sector_count() as usize).min(DISK_SECTORS);
        for (sector, buf) in self.disk.chunks_exact_mut(SECTOR_SIZE).take(sectors).enumerate() {
            let buf = buf.try_into().expect("chunks have sector size");
            dev.read_sector(sector as u64, buf)?;
        }
        let disk_len = sectors * SECTOR_SIZE;

        let mut loaded = 0;
        let mut offset = 0;
        while offset + SECTOR_SIZE <= disk_len {
            let (name, size) = {
                let block = <&[u8; SECTOR_SIZE]>::try_from(&self.disk[offset..offset + SECTOR_SIZE])
                    .expect("slice has sector size");
                let header = TarHeader::from_block(block);
                if header.is_end() {
                    break;
                }
                if !header.has_ustar_magic() || !header.verify_checksum() {
                    log::error!("tar header at offset {offset} is corrupt: {header:?}");
                    return Err(FsError::InvalidHeader { offset });
                }
                let size = header.size().ok_or(FsError::InvalidHeader { offset })?;
                if offset + SECTOR_SIZE + size > disk_len {
                    log::error!("{header:?} extends beyond the end of the disk");
                    return Err(FsError::InvalidHeader { offset });
                }
                if !header.is_regular_file() || header.name().is_empty() {
                    log::debug!("skipping non-regular tar entry {header:?}");
                    offset += SECTOR_SIZE + align_up(size, SECTOR_SIZE);
                    continue;
                }
                let mut name = [0; NAME_LEN];
                name[..header.name().len()].copy_from_slice(header.name());
                (name, size)
            };
            let name = &name[..name.iter().position(|b| *b == 0).unwrap_or(NAME_LEN)];
            let data_start = offset + SECTOR_SIZE;
            offset = data_start + align_up(size, SECTOR_SIZE);

            if size > FILE_CAPACITY {
                log::warn!(
                    "skipping file {:?} because its {size} bytes exceed the file capacity",
                    core::str::from_utf8(name).unwrap_or("<binary>")
                );
                continue;
            }
            match self.find_or_create_index(name) {
                Ok(idx) => {
                    let file = &mut self.files[idx];
                    file.data[..size].copy_from_slice(&self.disk[data_start..data_start + size]);
                    file.size = size;
                    loaded += 1;
                    log::info!("loaded file {:?}", file);
                }
                Err(e) => log::warn!(
                    "skipping file {:?}: {e}",
                    core::str::from_utf8(name).unwrap_or("<binary>")
                ),
            }
        }
        Ok(loaded)
    }

    /// Serialize all files into a tar image and write it to `dev`.
    ///
    /// Nothing is written to a device that cannot hold the whole image.
    pub fn flush(&mut self, dev: &mut (impl BlockDevice + ?Sized)) -> Result<(), FsError> {
        let sectors = dev.sector_count();
        if sectors < DISK_SECTORS as u64 {
            return Err(FsError::DeviceTooSmall { sectors });
        }
        self.disk.fill(0);

        let mut offset = 0;
        for file in self.files.iter().filter(|file| file.in_use) {
            let header = TarHeader::new_file(file.name(), file.size);
            self.disk[offset..offset + SECTOR_SIZE].copy_from_slice(header.as_bytes());
            let data_start = offset + SECTOR_SIZE;
            self.disk[data_start..data_start + file.size].copy_from_slice(file.data());
            offset = data_start + align_up(file.size, SECTOR_SIZE);
        }

        for (sector, buf) in self.disk.chunks_exact(SECTOR_SIZE).enumerate() {
            let buf = buf.try_into().expect("chunks have sector size");
            dev.write_sector(sector as u64, buf)?;
        }
        log::debug!("flushed {} files to disk", self.files().count());
        Ok(())
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for FileTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.files()).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ram_disk::RamDisk;
    use crate::IoError;
    use std::boxed::Box;

    fn table() -> Box<FileTable> {
        Box::new(FileTable::new())
    }

    #[test]
    fn test_find_or_create() {
        let mut table = table();
        table.find_or_create(b"a.txt").unwrap();
        table.find_or_create(b"b.txt").unwrap().set_data(b"bee").unwrap();
        // existing files are found instead of created
        assert_eq!(table.find_or_create(b"b.txt").unwrap().data(), b"bee");
        assert_eq!(table.find_or_create(b"c.txt").unwrap_err(), FsError::TableFull);
        assert_eq!(table.files().count(), 2);
    }

    #[test]
    fn test_invalid_names_are_refused() {
        let mut table = table();
        assert_eq!(table.find_or_create(b"").unwrap_err(), FsError::InvalidName);
        assert_eq!(
            table.find_or_create(&[b'x'; NAME_LEN + 1]).unwrap_err(),
            FsError::InvalidName
        );
        assert_eq!(table.find_or_create(b"a\0b").unwrap_err(), FsError::InvalidName);
        assert!(table.find_or_create(&[b'x'; NAME_LEN]).is_ok());
    }

    #[test]
    fn test_write_then_read() {
        let mut table = table();
        assert_eq!(table.write(b"a.txt", b"hello world"), Ok(11));

        let mut buf = [0; 64];
        assert_eq!(table.read(b"a.txt", &mut buf), Ok(11));
        assert_eq!(&buf[..11], b"hello world");

        // short buffers receive a prefix
        let mut buf = [0; 5];
        assert_eq!(table.read(b"a.txt", &mut buf), Ok(5));
        assert_eq!(&buf, b"hello");

        // overwriting replaces the whole content
        table.write(b"a.txt", b"hi").unwrap();
        assert_eq!(table.lookup(b"a.txt").unwrap().data(), b"hi");
        assert_eq!(table.read(b"b.txt", &mut buf), Err(FsError::NotFound));
    }

    #[test]
    fn test_oversized_write_leaves_table_unchanged() {
        let mut table = table();
        let data = [1; FILE_CAPACITY + 1];
        assert_eq!(
            table.write(b"big", &data),
            Err(FsError::TooLarge {
                size: FILE_CAPACITY + 1
            })
        );
        assert!(table.lookup(b"big").is_none());
        assert_eq!(table.write(b"big", &data[..FILE_CAPACITY]), Ok(FILE_CAPACITY));
    }

    fn assert_same_files(a: &FileTable, b: &FileTable) {
        let a: std::vec::Vec<_> = a.files().map(|f| (f.name(), f.data())).collect();
        let b: std::vec::Vec<_> = b.files().map(|f| (f.name(), f.data())).collect();
        assert_eq!(a, b);
    }

    fn flush_then_load(files: &[(&[u8], &[u8])]) {
        let mut disk = RamDisk::new(DISK_SECTORS);
        let mut table = table();
        for (name, data) in files {
            table.write(name, data).unwrap();
        }
        table.flush(&mut disk).unwrap();

        let mut loaded = self::table();
        assert_eq!(loaded.load(&mut disk), Ok(files.len()));
        assert_same_files(&table, &loaded);
    }

    #[test]
    fn test_flush_then_load_reproduces_files() {
        flush_then_load(&[]);
        flush_then_load(&[(b"a.txt".as_slice(), b"hello".as_slice())]);
        flush_then_load(&[
            (b"first".as_slice(), [0xaa; FILE_CAPACITY].as_slice()),
            (b"second".as_slice(), b"".as_slice()),
        ]);
    }

    #[test]
    fn test_hello_becomes_world_across_reboots() {
        let mut disk = RamDisk::new(DISK_SECTORS);
        disk.store(TarHeader::new_file(b"a.txt", 5).as_bytes(), 0);
        disk.store(b"hello", 1);

        let mut table = table();
        assert_eq!(table.load(&mut disk), Ok(1));
        let mut buf = [0; 5];
        assert_eq!(table.read(b"a.txt", &mut buf), Ok(5));
        assert_eq!(&buf, b"hello");

        table.write(b"a.txt", b"world").unwrap();
        table.flush(&mut disk).unwrap();

        let mut rebooted = self::table();
        rebooted.load(&mut disk).unwrap();
        assert_eq!(rebooted.lookup(b"a.txt").unwrap().data(), b"world");
    }

    #[test]
    fn test_load_skips_what_does_not_fit() {
        let mut disk = RamDisk::new(DISK_SECTORS);
        let mut dir = TarHeader::new_file(b"dir/", 0);
        dir.typeflag = b'5';
        dir.update_checksum();
        disk.store(dir.as_bytes(), 0);
        disk.store(TarHeader::new_file(b"one", 3).as_bytes(), 1);
        disk.store(b"111", 2);
        disk.store(TarHeader::new_file(b"two", 3).as_bytes(), 3);
        disk.store(b"222", 4);
        disk.store(TarHeader::new_file(b"three", 3).as_bytes(), 5);
        disk.store(b"333", 6);

        let mut table = table();
        assert_eq!(table.load(&mut disk), Ok(2));
        assert!(table.lookup(b"dir/").is_none());
        assert_eq!(table.lookup(b"two").unwrap().data(), b"222");
        assert!(table.lookup(b"three").is_none());
    }

    #[test]
    fn test_load_skips_oversized_files() {
        let mut disk = RamDisk::new(DISK_SECTORS);
        disk.store(TarHeader::new_file(b"big", FILE_CAPACITY + 1).as_bytes(), 0);
        disk.store(TarHeader::new_file(b"small", 1).as_bytes(), 4);
        disk.store(b"s", 5);

        let mut table = table();
        assert_eq!(table.load(&mut disk), Ok(1));
        assert_eq!(table.lookup(b"small").unwrap().data(), b"s");
    }

    #[test]
    fn test_corrupt_header_stops_loading() {
        let mut disk = RamDisk::new(DISK_SECTORS);
        disk.store(TarHeader::new_file(b"good", 2).as_bytes(), 0);
        disk.store(b"ok", 1);
        let mut bad = TarHeader::new_file(b"bad", 2);
        bad.size[0] = b'7';
        disk.store(bad.as_bytes(), 2);

        let mut table = table();
        assert_eq!(
            table.load(&mut disk),
            Err(FsError::InvalidHeader {
                offset: 2 * SECTOR_SIZE
            })
        );
        assert_eq!(table.lookup(b"good").unwrap().data(), b"ok");
    }

    #[test]
    fn test_device_errors_are_propagated() {
        let mut disk = RamDisk::new(DISK_SECTORS);
        disk.failing_sector = Some(3);
        let mut table = table();
        assert_eq!(table.load(&mut disk), Err(FsError::Io(IoError { sector: 3 })));
        table.write(b"a", b"a").unwrap();
        assert_eq!(table.flush(&mut disk), Err(FsError::Io(IoError { sector: 3 })));
    }

    #[test]
    fn test_small_devices_are_read_partially() {
        let mut disk = RamDisk::new(2);
        disk.store(TarHeader::new_file(b"a.txt", 5).as_bytes(), 0);
        disk.store(b"hello", 1);

        let mut table = table();
        assert_eq!(table.load(&mut disk), Ok(1));
        assert_eq!(disk.reads, 2);
    }

    #[test]
    fn test_flush_leaves_small_devices_untouched() {
        let mut disk = RamDisk::new(2);
        disk.store(b"old", 0);
        let mut table = table();
        table.write(b"a.txt", b"hello").unwrap();

        assert_eq!(table.flush(&mut disk), Err(FsError::DeviceTooSmall { sectors: 2 }));
        assert_eq!(&disk.sectors[0][..4], b"old\0");
        assert_eq!(table.lookup(b"a.txt").unwrap().data(), b"hello");
    }
}
