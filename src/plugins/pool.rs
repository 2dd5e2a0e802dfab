use bevy::prelude::*;

/// Components that can be handed back to a [`ComponentPool`] and reused.
pub trait Poolable {
    /// Restores the freshly-constructed state.
    fn reset(&mut self);
}

/// Free list of one component kind. The pool owns free instances; an entity
/// owns its checked-out instance until it is released again.
#[derive(Resource)]
pub struct ComponentPool<T: Poolable + Default + Send + Sync + 'static> {
    free: Vec<T>,
}

impl<T: Poolable + Default + Send + Sync + 'static> Default for ComponentPool<T> {
    fn default() -> Self {
        Self { free: Vec::new() }
    }
}

impl<T: Poolable + Default + Send + Sync + 'static> ComponentPool<T> {
    pub fn acquire(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    pub fn release(&mut self, mut value: T) {
        value.reset();
        self.free.push(value);
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
