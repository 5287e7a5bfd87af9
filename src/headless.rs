//! A [`RenderBackend`] without a GPU.
//!
//! `HeadlessBackend` keeps the same resource tables a real context would and
//! records what happened to them: how many resources are alive, how many were
//! disposed twice, how many frames were drawn and what the last frame contained.
//! The engine takes ownership of its backend, so the record is read through a
//! [`HeadlessProbe`] obtained before mounting. Tests drive the engine this way,
//! and hosts without a GPU can use it to run the board logic unattended.

use std::{cell::RefCell, rc::Rc};

use slotmap::SlotMap;

use crate::{
    camera::Camera,
    data_structures::{
        geometry::{MeshData, Topology},
        scene_graph::Scene,
    },
    render::{
        DrawError, FrameBatches, GeometryId, Light, LightId, Material, MaterialId, RenderBackend,
        Surface,
    },
};

#[derive(Clone, Debug)]
pub struct GeometryRecord {
    pub label: String,
    pub topology: Topology,
    pub primitives: usize,
}

#[derive(Debug, Default)]
struct Ledger {
    geometries: SlotMap<GeometryId, GeometryRecord>,
    materials: SlotMap<MaterialId, Material>,
    lights: SlotMap<LightId, Light>,
    size: (u32, u32),
    draws: u64,
    double_disposals: u32,
    context_lost: bool,
    /// Resources still alive when the context itself was disposed.
    leaked_at_dispose: Option<usize>,
    last_frame: Option<FrameBatches>,
}

impl Ledger {
    fn live(&self) -> usize {
        self.geometries.len() + self.materials.len() + self.lights.len()
    }
}

#[derive(Debug)]
pub struct HeadlessBackend {
    ledger: Rc<RefCell<Ledger>>,
}

/// Read access to a [`HeadlessBackend`]'s record that outlives the backend.
#[derive(Clone, Debug)]
pub struct HeadlessProbe {
    ledger: Rc<RefCell<Ledger>>,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            ledger: Rc::new(RefCell::new(Ledger {
                size: (width, height),
                ..Default::default()
            })),
        }
    }

    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            ledger: Rc::clone(&self.ledger),
        }
    }
}

impl HeadlessProbe {
    /// Makes every subsequent draw report a lost context.
    pub fn lose_context(&self) {
        self.ledger.borrow_mut().context_lost = true;
    }

    pub fn draws(&self) -> u64 {
        self.ledger.borrow().draws
    }

    pub fn size(&self) -> (u32, u32) {
        self.ledger.borrow().size
    }

    pub fn live_geometries(&self) -> usize {
        self.ledger.borrow().geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.ledger.borrow().materials.len()
    }

    pub fn live_lights(&self) -> usize {
        self.ledger.borrow().lights.len()
    }

    pub fn live_resources(&self) -> usize {
        self.ledger.borrow().live()
    }

    /// Dispose calls that named a resource which was no longer alive.
    pub fn double_disposals(&self) -> u32 {
        self.ledger.borrow().double_disposals
    }

    /// `None` until the context is disposed; then the number of resources the
    /// owner had not released individually beforehand.
    pub fn leaked_at_dispose(&self) -> Option<usize> {
        self.ledger.borrow().leaked_at_dispose
    }

    pub fn is_disposed(&self) -> bool {
        self.ledger.borrow().leaked_at_dispose.is_some()
    }

    pub fn geometry(&self, id: GeometryId) -> Option<GeometryRecord> {
        self.ledger.borrow().geometries.get(id).cloned()
    }

    pub fn material(&self, id: MaterialId) -> Option<Material> {
        self.ledger.borrow().materials.get(id).copied()
    }

    /// Batches of the most recent successful draw, as (surface, instance count) pairs.
    pub fn last_frame_batches(&self) -> Vec<(Surface, u32)> {
        self.ledger
            .borrow()
            .last_frame
            .as_ref()
            .map(|frame| {
                frame
                    .batches
                    .iter()
                    .map(|b| (b.surface, b.instances.end - b.instances.start))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_geometry(&mut self, label: &str, mesh: &MeshData) -> GeometryId {
        self.ledger.borrow_mut().geometries.insert(GeometryRecord {
            label: label.to_string(),
            topology: mesh.topology,
            primitives: mesh.primitive_count(),
        })
    }

    fn create_material(&mut self, material: Material) -> MaterialId {
        self.ledger.borrow_mut().materials.insert(material)
    }

    fn create_light(&mut self, light: Light) -> LightId {
        self.ledger.borrow_mut().lights.insert(light)
    }

    fn dispose_geometry(&mut self, id: GeometryId) {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.geometries.remove(id).is_none() {
            ledger.double_disposals += 1;
        }
    }

    fn dispose_material(&mut self, id: MaterialId) {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.materials.remove(id).is_none() {
            ledger.double_disposals += 1;
        }
    }

    fn dispose_light(&mut self, id: LightId) {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.lights.remove(id).is_none() {
            ledger.double_disposals += 1;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ledger.borrow_mut().size = (width, height);
        }
    }

    fn draw(&mut self, scene: &Scene, _camera: &Camera) -> Result<(), DrawError> {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.context_lost {
            return Err(DrawError::ContextLost);
        }
        // a zero-sized surface is never configured, so nothing reaches the screen
        if ledger.leaked_at_dispose.is_some() || ledger.size.0 == 0 || ledger.size.1 == 0 {
            return Ok(());
        }
        let frame = FrameBatches::collect(scene, |id| ledger.materials.get(id).copied());
        if let Some(batch) = frame
            .batches
            .iter()
            .find(|batch| !ledger.geometries.contains_key(batch.geometry))
        {
            return Err(DrawError::Other(format!(
                "batch references disposed geometry {:?}",
                batch.geometry
            )));
        }
        ledger.draws += 1;
        ledger.last_frame = Some(frame);
        Ok(())
    }

    fn dispose(&mut self) {
        let mut ledger = self.ledger.borrow_mut();
        if ledger.leaked_at_dispose.is_some() {
            return;
        }
        let live = ledger.live();
        ledger.leaked_at_dispose = Some(live);
        ledger.geometries.clear();
        ledger.materials.clear();
        ledger.lights.clear();
        ledger.last_frame = None;
    }
}
