//! An in-memory virtio block device that processes requests as soon as it is notified

use crate::{
    BlkRequest, DeviceId, DeviceStatus, Transport, VirtQueue, VIRTIO_BLK_T_OUT, LEGACY_VERSION,
    QUEUE_SIZE, SECTOR_SIZE, VIRTIO_MAGIC,
};
use core::ptr;
use std::alloc::{alloc_zeroed, Layout};
use std::vec;
use std::vec::Vec;

/// Allocate memory for a queue and a request that lives for the rest of the test
pub fn blk_memory() -> (&'static mut VirtQueue, &'static mut BlkRequest) {
    unsafe {
        let queue = alloc_zeroed(Layout::new::<VirtQueue>()).cast::<VirtQueue>();
        let request = alloc_zeroed(Layout::new::<BlkRequest>()).cast::<BlkRequest>();
        assert!(!queue.is_null() && !request.is_null());
        (VirtQueue::init(queue), BlkRequest::init(request))
    }
}

pub struct MockDevice {
    pub magic: u32,
    pub version: u32,
    pub device_id: u32,
    pub max_queue_size: u32,
    pub status: DeviceStatus,
    pub page_size: u32,
    pub queue_size: u32,
    queue: Option<*mut VirtQueue>,
    last_avail: u16,
    pub sectors: Vec<[u8; SECTOR_SIZE]>,
    /// Requests for this sector fail with status `1`
    pub failing_sector: Option<u64>,
    pub last_sector: Option<u64>,
    pub completed: usize,
}

impl MockDevice {
    pub fn new(sectors: usize) -> Self {
        Self {
            magic: VIRTIO_MAGIC,
            version: LEGACY_VERSION,
            device_id: 2,
            max_queue_size: 1024,
            status: DeviceStatus::empty(),
            page_size: 0,
            queue_size: 0,
            queue: None,
            last_avail: 0,
            sectors: vec![[0; SECTOR_SIZE]; sectors],
            failing_sector: None,
            last_sector: None,
            completed: 0,
        }
    }

    /// Process one descriptor chain and return the number of bytes written into guest memory
    unsafe fn process(&mut self, queue: *mut VirtQueue, head: u16) -> u32 {
        let desc = |idx: u16| ptr::read_volatile(&(*queue).descriptors[idx as usize]);
        let header = desc(head);
        let data = desc(header.next);
        let status = desc(data.next);

        let request = header.address as usize as *const BlkRequest;
        let req_type = ptr::read_volatile(&(*request).req_type);
        let sector = ptr::read_volatile(&(*request).sector);
        let status_ptr = status.address as usize as *mut u8;
        self.last_sector = Some(sector);

        if self.failing_sector == Some(sector) || sector as usize >= self.sectors.len() {
            status_ptr.write_volatile(1);
            return 1;
        }

        let data_ptr = data.address as usize as *mut u8;
        assert_eq!(data.length as usize, SECTOR_SIZE);
        let written = if req_type == VIRTIO_BLK_T_OUT {
            ptr::copy_nonoverlapping(data_ptr, self.sectors[sector as usize].as_mut_ptr(), SECTOR_SIZE);
            1
        } else {
            ptr::copy_nonoverlapping(self.sectors[sector as usize].as_ptr(), data_ptr, SECTOR_SIZE);
            SECTOR_SIZE as u32 + 1
        };
        status_ptr.write_volatile(0);
        written
    }
}

impl Transport for MockDevice {
    fn magic(&self) -> u32 {
        self.magic
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn device_id(&self) -> DeviceId {
        DeviceId::from(self.device_id)
    }

    fn status(&self) -> DeviceStatus {
        self.status
    }

    fn set_status(&mut self, status: DeviceStatus) {
        self.status = status;
    }

    fn set_guest_page_size(&mut self, size: u32) {
        self.page_size = size;
    }

    fn max_queue_size(&mut self, _queue: u32) -> u32 {
        self.max_queue_size
    }

    fn queue_used(&mut self, _queue: u32) -> bool {
        self.queue.is_some()
    }

    fn setup_queue(&mut self, queue: u32, size: u32, align: u32, addr: usize) {
        assert_eq!(queue, 0);
        assert_eq!(align, self.page_size);
        self.queue_size = size;
        self.queue = Some(addr as *mut VirtQueue);
    }

    fn notify(&mut self, _queue: u32) {
        let queue = self.queue.expect("notified before the queue was set up");
        unsafe {
            let avail_idx = ptr::read_volatile(&(*queue).avail.idx);
            while self.last_avail != avail_idx {
                let head = ptr::read_volatile(
                    &(*queue).avail.ring[self.last_avail as usize % QUEUE_SIZE],
                );
                let len = self.process(queue, head);

                let used_idx = ptr::read_volatile(&(*queue).used.idx);
                let elem = &mut (*queue).used.ring[used_idx as usize % QUEUE_SIZE];
                elem.id = head as u32;
                elem.len = len;
                ptr::write_volatile(&mut (*queue).used.idx, used_idx.wrapping_add(1));

                self.last_avail = self.last_avail.wrapping_add(1);
                self.completed += 1;
            }
        }
    }

    fn read_config(&self, offset: usize) -> u32 {
        let capacity = self.sectors.len() as u64;
        match offset {
            0 => capacity as u32,
            4 => (capacity >> 32) as u32,
            _ => 0,
        }
    }
}
