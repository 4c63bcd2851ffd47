//! Busy-indicator sprite animation.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;

pub const SPRITE_SRC: &str = "images/spriteLoader.gif";
pub const FRAME_COUNT: u32 = 22;
pub const FRAME_WIDTH: u32 = 128;
pub const FRAME_HEIGHT: u32 = 128;
const SPEED: f64 = 9.0;

/// Milliseconds between frames.
pub fn frame_period_ms() -> u32 {
    let fps = (100.0 / SPEED).round();
    (1000.0 / fps) as u32
}

/// Position within the sprite strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteCycle {
    index: u32,
    frames: u32,
    frame_width: u32,
}

impl SpriteCycle {
    pub fn new(frames: u32, frame_width: u32) -> Self {
        Self {
            index: 0,
            frames: frames.max(1),
            frame_width,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Move to the next frame, wrapping to the first.
    pub fn advance(&mut self) -> u32 {
        self.index = (self.index + 1) % self.frames;
        self.index
    }

    pub fn x_offset(&self) -> u32 {
        self.index * self.frame_width
    }

    /// CSS `background-position` for the current frame.
    pub fn background_position(&self) -> String {
        format!("{}px 0", -i64::from(self.x_offset()))
    }
}

impl Default for SpriteCycle {
    fn default() -> Self {
        Self::new(FRAME_COUNT, FRAME_WIDTH)
    }
}

/// Where frames are drawn. Implementations must tolerate a missing target.
pub trait FrameSink {
    fn prepare(&self);
    fn show_frame(&self, background_position: &str);
}

/// Repeating timer. Dropping the returned task cancels it.
pub trait FrameScheduler {
    type Task;

    fn every(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> Self::Task;
}

pub struct IntervalScheduler;

impl FrameScheduler for IntervalScheduler {
    type Task = gloo_timers::callback::Interval;

    fn every(&self, period_ms: u32, mut tick: Box<dyn FnMut()>) -> Self::Task {
        gloo_timers::callback::Interval::new(period_ms, move || tick())
    }
}

/// Draws the sprite into the element with the given id, if present.
pub struct ElementSprite {
    element_id: String,
}

impl ElementSprite {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
        }
    }

    fn element(&self) -> Option<web_sys::HtmlElement> {
        web_sys::window()?
            .document()?
            .get_element_by_id(&self.element_id)?
            .dyn_into::<web_sys::HtmlElement>()
            .ok()
    }
}

impl FrameSink for ElementSprite {
    fn prepare(&self) {
        if let Some(el) = self.element() {
            let style = el.style();
            let _ = style.set_property("background-image", &format!("url({})", SPRITE_SRC));
            let _ = style.set_property("width", &format!("{}px", FRAME_WIDTH));
            let _ = style.set_property("height", &format!("{}px", FRAME_HEIGHT));
        }
    }

    fn show_frame(&self, background_position: &str) {
        if let Some(el) = self.element() {
            let _ = el
                .style()
                .set_property("background-position", background_position);
        }
    }
}

pub struct ImageLoader<S: FrameScheduler> {
    scheduler: S,
    sink: Rc<dyn FrameSink>,
    cycle: Rc<RefCell<SpriteCycle>>,
    task: RefCell<Option<S::Task>>,
}

impl<S: FrameScheduler> ImageLoader<S> {
    pub fn new(scheduler: S, sink: Rc<dyn FrameSink>) -> Self {
        Self {
            scheduler,
            sink,
            cycle: Rc::new(RefCell::new(SpriteCycle::default())),
            task: RefCell::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.borrow().is_some()
    }

    pub fn frame(&self) -> u32 {
        self.cycle.borrow().index()
    }

    /// Start animating. A second call while running keeps the existing task.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }
        self.sink.prepare();

        let cycle = Rc::clone(&self.cycle);
        let sink = Rc::clone(&self.sink);
        let task = self.scheduler.every(
            frame_period_ms(),
            Box::new(move || advance_frame(&cycle, sink.as_ref())),
        );
        *self.task.borrow_mut() = Some(task);
    }

    pub fn stop(&self) {
        self.task.borrow_mut().take();
    }

    pub fn tick(&self) {
        advance_frame(&self.cycle, self.sink.as_ref());
    }
}

fn advance_frame(cycle: &RefCell<SpriteCycle>, sink: &dyn FrameSink) {
    let position = {
        let mut cycle = cycle.borrow_mut();
        cycle.advance();
        cycle.background_position()
    };
    sink.show_frame(&position);
}
