#![allow(dead_code)]

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use futures::channel::oneshot;
use step_ngin::{
    BoardSetup, Engine, EngineConfig, EngineError, EngineListener, FetchReceiver, HeadlessBackend,
    HeadlessProbe, ModelSource,
};

pub const FRAME: f64 = 1000.0 / 60.0;

#[derive(Debug, Default)]
pub(crate) struct Events {
    pub load_complete: u32,
    pub errors: Vec<String>,
    pub context_lost: u32,
}

pub(crate) struct Recorder(pub Rc<RefCell<Events>>);

impl EngineListener for Recorder {
    fn on_load_complete(&mut self) {
        self.0.borrow_mut().load_complete += 1;
    }

    fn on_error(&mut self, error: &EngineError) {
        self.0.borrow_mut().errors.push(error.to_string());
    }

    fn on_context_lost(&mut self) {
        self.0.borrow_mut().context_lost += 1;
    }
}

/// A model source whose fetches only settle when the test says so.
#[derive(Default)]
pub(crate) struct ManualSource {
    senders: RefCell<Vec<oneshot::Sender<anyhow::Result<Vec<u8>>>>>,
    pub references: RefCell<Vec<String>>,
}

impl ModelSource for ManualSource {
    fn fetch(&self, reference: &str) -> FetchReceiver {
        let (sender, receiver) = oneshot::channel();
        self.senders.borrow_mut().push(sender);
        self.references.borrow_mut().push(reference.to_string());
        receiver
    }
}

impl ManualSource {
    /// Settles the latest fetch. `false` if nobody is listening any more.
    pub fn settle(&self, result: anyhow::Result<Vec<u8>>) -> bool {
        match self.senders.borrow_mut().pop() {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }
}

pub(crate) struct TestBoard {
    pub engine: Engine<HeadlessBackend>,
    pub backend: Option<HeadlessBackend>,
    pub probe: HeadlessProbe,
    pub events: Rc<RefCell<Events>>,
    pub source: ManualSource,
}

impl TestBoard {
    /// An engine that has not been mounted yet, with its backend on the side.
    pub fn new(special: &[u32]) -> Self {
        let events = Rc::new(RefCell::new(Events::default()));
        let special: HashSet<u32> = special.iter().copied().collect();
        let engine = Engine::new(
            BoardSetup::new("pawn.glb", special),
            EngineConfig::default(),
            Box::new(Recorder(Rc::clone(&events))),
        );
        let backend = HeadlessBackend::new(1280, 720);
        let probe = backend.probe();
        Self {
            engine,
            backend: Some(backend),
            probe,
            events,
            source: ManualSource::default(),
        }
    }

    /// A board mounted at t = 0.
    pub fn mounted(special: &[u32]) -> Self {
        let mut board = Self::new(special);
        board.mount(0.0);
        board
    }

    pub fn mount(&mut self, now: f64) {
        let backend = self.backend.take().expect("backend already handed to the engine");
        self.engine
            .mount(Ok(backend), (1280, 720), &self.source, now)
            .expect("mount");
    }

    /// Runs frames every `FRAME` ms from `from` up to and including `to`.
    pub fn run_frames(&mut self, from: f64, to: f64) {
        let mut now = from;
        while now <= to {
            self.engine.frame(now);
            now += FRAME;
        }
    }

    pub fn load_complete(&self) -> u32 {
        self.events.borrow().load_complete
    }

    pub fn errors(&self) -> Vec<String> {
        self.events.borrow().errors.clone()
    }
}

fn pad(mut bytes: Vec<u8>, with: u8) -> Vec<u8> {
    while bytes.len() % 4 != 0 {
        bytes.push(with);
    }
    bytes
}

/// A GLB with two nodes, each holding a single triangle.
pub fn two_part_glb() -> Vec<u8> {
    let mut bin = Vec::new();
    for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in p {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    let bin = pad(bin, 0);
    let json = format!(
        r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0,1]}}],
"nodes":[{{"name":"body","mesh":0}},{{"name":"head","mesh":0,"translation":[0.0,2.0,0.0]}}],
"meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],
"buffers":[{{"byteLength":{}}}],
"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}}],
"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}}]}}"#,
        bin.len()
    );
    let json = pad(json.into_bytes(), b' ');

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}
