//! Minimal host plot: an ordered set of renderables sharing one backend and
//! one view.

use std::any::Any;

use crate::error::Result;
use crate::gpu::GpuBackend;
use crate::pick::{PickQuery, PickResult};
use crate::view::PlotView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// A renderable the host draws, picks and eventually disposes.
pub trait PlotObject: Any {
    fn draw(&mut self, backend: &mut dyn GpuBackend, view: &PlotView) -> Result<()>;

    /// Take part in the id pass starting at `pick_offset`; returns the next
    /// free offset.
    fn draw_pick(&mut self, pick_offset: u32) -> u32;

    fn pick(&self, query: &PickQuery) -> Option<PickResult>;

    /// Release GPU resources. Called after the host has detached the object.
    fn dispose(&mut self, backend: &mut dyn GpuBackend);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub struct Plot2d<B: GpuBackend> {
    backend: B,
    view: PlotView,
    objects: Vec<(ObjectId, Box<dyn PlotObject>)>,
    next_id: u64,
}

impl<B: GpuBackend> Plot2d<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            view: PlotView::default(),
            objects: Vec::new(),
            next_id: 0,
        }
    }

    pub fn with_view(mut self, view: PlotView) -> Self {
        self.view = view;
        self
    }

    pub fn view(&self) -> &PlotView {
        &self.view
    }

    pub fn set_view(&mut self, view: PlotView) {
        self.view = view;
    }

    pub fn view_mut(&mut self) -> &mut PlotView {
        &mut self.view
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.iter().any(|(oid, _)| *oid == id)
    }

    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().map(|(id, _)| *id)
    }

    pub fn add_object(&mut self, object: Box<dyn PlotObject>) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push((id, object));
        id
    }

    /// Detach an object without releasing its resources.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Box<dyn PlotObject>> {
        let index = self.objects.iter().position(|(oid, _)| *oid == id)?;
        Some(self.objects.remove(index).1)
    }

    /// Detach an object and release its GPU resources.
    pub fn dispose_object(&mut self, id: ObjectId) -> bool {
        match self.remove_object(id) {
            Some(mut object) => {
                object.dispose(&mut self.backend);
                true
            }
            None => false,
        }
    }

    pub fn object<T: PlotObject>(&self, id: ObjectId) -> Option<&T> {
        self.objects
            .iter()
            .find(|(oid, _)| *oid == id)?
            .1
            .as_any()
            .downcast_ref::<T>()
    }

    /// Run `f` with a typed handle to an object and the shared backend.
    pub fn with_object<T: PlotObject, R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut T, &mut dyn GpuBackend) -> R,
    ) -> Option<R> {
        let backend = &mut self.backend;
        let object = self
            .objects
            .iter_mut()
            .find(|(oid, _)| *oid == id)?
            .1
            .as_any_mut()
            .downcast_mut::<T>()?;
        Some(f(object, backend))
    }

    /// Draw every object in insertion order.
    pub fn draw(&mut self) -> Result<()> {
        for (_, object) in &mut self.objects {
            object.draw(&mut self.backend, &self.view)?;
        }
        Ok(())
    }

    pub fn draw_pick(&mut self, pick_offset: u32) -> u32 {
        self.objects
            .iter_mut()
            .fold(pick_offset, |offset, (_, object)| object.draw_pick(offset))
    }

    /// Topmost hit wins.
    pub fn pick(&self, query: &PickQuery) -> Option<(ObjectId, PickResult)> {
        self.objects
            .iter()
            .rev()
            .find_map(|(id, object)| object.pick(query).map(|hit| (*id, hit)))
    }
}
