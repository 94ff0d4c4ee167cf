use crate::units::*;
use cgmath::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

// Recycling store for per-step temporary buffers.
// Buffers are handed out as RAII guards and return to the store on drop,
// so the steady state simulation loop does not allocate.

pub struct ScratchBuffer<T: Copy> {
    pub buffer: Vec<T>,
    store: Rc<RefCell<Vec<Vec<T>>>>,
}

impl<T: Copy> Drop for ScratchBuffer<T> {
    fn drop(&mut self) {
        let mut returned = Vec::new();
        std::mem::swap(&mut returned, &mut self.buffer);
        self.store.borrow_mut().push(returned);
    }
}

fn checkout<T: Copy>(store: &Rc<RefCell<Vec<Vec<T>>>>, size: usize, default: T) -> ScratchBuffer<T> {
    let mut buffer = store.borrow_mut().pop().unwrap_or_default();
    buffer.clear();
    buffer.resize(size, default);
    ScratchBuffer {
        buffer,
        store: Rc::clone(store),
    }
}

pub struct ScratchBufferStore {
    buffers_real: Rc<RefCell<Vec<Vec<Real>>>>,
    buffers_vector: Rc<RefCell<Vec<Vec<Vector>>>>,
    buffers_point: Rc<RefCell<Vec<Vec<Point>>>>,
    buffers_index: Rc<RefCell<Vec<Vec<u32>>>>,
}

#[allow(clippy::new_without_default)]
impl ScratchBufferStore {
    pub fn new() -> ScratchBufferStore {
        ScratchBufferStore {
            buffers_real: Rc::new(RefCell::new(Vec::new())),
            buffers_vector: Rc::new(RefCell::new(Vec::new())),
            buffers_point: Rc::new(RefCell::new(Vec::new())),
            buffers_index: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn get_buffer_real(&self, size: usize) -> ScratchBuffer<Real> {
        checkout(&self.buffers_real, size, 0.0)
    }

    pub fn get_buffer_vector(&self, size: usize) -> ScratchBuffer<Vector> {
        checkout(&self.buffers_vector, size, Vector::zero())
    }

    pub fn get_buffer_point(&self, size: usize) -> ScratchBuffer<Point> {
        checkout(&self.buffers_point, size, Point::origin())
    }

    pub fn get_buffer_index(&self, size: usize) -> ScratchBuffer<u32> {
        checkout(&self.buffers_index, size, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_recycled() {
        let store = ScratchBufferStore::new();
        let first_ptr;
        {
            let scratch = store.get_buffer_real(128);
            first_ptr = scratch.buffer.as_ptr();
        }
        let scratch = store.get_buffer_real(64);
        assert_eq!(scratch.buffer.as_ptr(), first_ptr);
        assert_eq!(scratch.buffer.len(), 64);
    }

    #[test]
    fn recycled_buffers_are_reset_to_default() {
        let store = ScratchBufferStore::new();
        {
            let mut scratch = store.get_buffer_index(8);
            scratch.buffer.iter_mut().for_each(|v| *v = 42);
        }
        let scratch = store.get_buffer_index(8);
        assert!(scratch.buffer.iter().all(|&v| v == 0));
    }
}
