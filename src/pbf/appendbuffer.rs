use std::alloc::{self, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};

// Simple thread safe append buffer with a fixed capacity chosen at construction.
// Appending beyond capacity fails and leaves the buffer untouched.
// (similar to the AppendBuffer concept in shader languages)
pub struct AppendBuffer<T: Copy> {
    capacity: usize,
    size: AtomicUsize,
    data: *mut T,
}

impl<T: Copy> AppendBuffer<T> {
    fn buffer_layout(capacity: usize) -> Layout {
        Layout::from_size_align(std::mem::size_of::<T>() * capacity, std::mem::align_of::<T>()).unwrap()
    }

    pub fn with_capacity(capacity: usize) -> AppendBuffer<T> {
        let data = if capacity == 0 {
            std::ptr::null_mut()
        } else {
            unsafe { alloc::alloc(Self::buffer_layout(capacity)).cast() }
        };
        AppendBuffer {
            capacity,
            size: AtomicUsize::new(0),
            data,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.data, self.size.load(Ordering::Acquire)) }
    }

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Threadsafe appending!
    pub fn push(&self, value: T) -> bool {
        let previous_size = self.size.fetch_add(1, Ordering::Relaxed);
        if previous_size >= self.capacity {
            self.size.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        unsafe {
            self.data.add(previous_size).write(value);
        }
        true
    }

    pub fn clear(&mut self) {
        self.size.store(0, Ordering::Release);
    }
}

impl<T: Copy> Drop for AppendBuffer<T> {
    fn drop(&mut self) {
        if self.capacity > 0 {
            unsafe {
                alloc::dealloc(self.data.cast(), Self::buffer_layout(self.capacity));
            }
        }
    }
}

unsafe impl<T: Copy> Sync for AppendBuffer<T> {}
unsafe impl<T: Copy> Send for AppendBuffer<T> {}
