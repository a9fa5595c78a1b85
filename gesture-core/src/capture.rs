//! # Sample Capture
//!
//! Turns pointer and touch input into bounded strokes.
//!
//! ```text
//! pointer down ─► begin ─► move ─► move ─► ... ─► pointer up ─► CapturedGesture
//!                   └───── sliding window of max_stroke_points ─────┘
//! ```
//!
//! A second finger going down while the first is active opens a secondary
//! stroke; the gesture is handed over once every finger has lifted. Pointers
//! beyond the second are ignored.

use std::collections::VecDeque;

use crate::event::{Sample, TouchEvent, TouchPhase};

/// A finished stroke: the ordered samples of one pointer-down to pointer-up
/// interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stroke {
    samples: Vec<Sample>,
}

impl Stroke {
    /// Create a stroke from samples in arrival order.
    #[must_use]
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// All samples in arrival order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// First sample.
    #[must_use]
    pub fn start(&self) -> Option<&Sample> {
        self.samples.first()
    }

    /// Latest sample.
    #[must_use]
    pub fn current(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the stroke has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Two strokes captured concurrently, as seen by the pinch detector.
#[derive(Debug, Clone, Copy)]
pub struct TouchPair<'a> {
    /// Stroke of the first finger.
    pub first: &'a Stroke,
    /// Stroke of the second finger.
    pub second: &'a Stroke,
}

/// Everything captured between the first pointer going down and the last
/// pointer lifting.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedGesture {
    /// Stroke of the first pointer.
    pub primary: Stroke,
    /// Stroke of a second concurrent pointer, if any.
    pub secondary: Option<Stroke>,
    /// Maximum number of pointers down at the same time.
    pub touch_count: usize,
}

impl CapturedGesture {
    /// Wrap a single stroke.
    #[must_use]
    pub fn single(stroke: Stroke) -> Self {
        Self {
            primary: stroke,
            secondary: None,
            touch_count: 1,
        }
    }

    /// Both strokes as a touch pair, when two fingers were down.
    #[must_use]
    pub fn touch_pair(&self) -> Option<TouchPair<'_>> {
        self.secondary.as_ref().map(|second| TouchPair {
            first: &self.primary,
            second,
        })
    }

    /// Iterate over every captured stroke, primary first.
    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }
}

#[derive(Debug, Clone)]
struct ActiveStroke {
    pointer_id: u32,
    samples: VecDeque<Sample>,
    lifted: bool,
}

impl ActiveStroke {
    fn push(&mut self, sample: Sample, cap: usize) {
        self.samples.push_back(sample);
        while self.samples.len() > cap {
            self.samples.pop_front();
        }
    }

    fn into_stroke(self) -> Stroke {
        Stroke::new(self.samples.into())
    }
}

/// Sample capture for up to two concurrent pointers.
#[derive(Debug, Clone)]
pub struct StrokeCapture {
    max_points: usize,
    strokes: Vec<ActiveStroke>,
    peak_touches: usize,
}

impl StrokeCapture {
    /// Create a capture buffer keeping at most `max_points` samples per
    /// stroke.
    #[must_use]
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(1),
            strokes: Vec::with_capacity(2),
            peak_touches: 0,
        }
    }

    /// Maximum samples kept per stroke.
    #[must_use]
    pub const fn max_points(&self) -> usize {
        self.max_points
    }

    /// Check if a stroke is open.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        !self.strokes.is_empty()
    }

    /// Number of pointers currently down.
    #[must_use]
    pub fn active_pointers(&self) -> usize {
        self.strokes.iter().filter(|s| !s.lifted).count()
    }

    /// Number of samples buffered for the primary stroke.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.strokes.first().map_or(0, |s| s.samples.len())
    }

    /// Open a new single-pointer stroke, discarding anything in progress.
    pub fn begin_stroke(&mut self, sample: Sample) {
        self.cancel();
        self.pointer_down(0, sample);
    }

    /// Append to the primary stroke. No-op when no stroke is open.
    pub fn append_sample(&mut self, sample: Sample) {
        let cap = self.max_points;
        if let Some(stroke) = self.strokes.first_mut().filter(|s| !s.lifted) {
            stroke.push(sample, cap);
        }
    }

    /// Close every open stroke and hand the result over for evaluation.
    ///
    /// Returns `None` when nothing was being captured.
    pub fn end_stroke(&mut self) -> Option<CapturedGesture> {
        for stroke in &mut self.strokes {
            stroke.lifted = true;
        }
        self.finish()
    }

    /// Discard the capture in progress without evaluating it.
    pub fn cancel(&mut self) {
        if self.is_capturing() {
            tracing::debug!("Stroke capture cancelled ({} samples)", self.buffered());
        }
        self.strokes.clear();
        self.peak_touches = 0;
    }

    /// A pointer went down.
    ///
    /// The first pointer opens the primary stroke, a second concurrent one
    /// opens the secondary stroke, further pointers are ignored.
    pub fn pointer_down(&mut self, pointer_id: u32, sample: Sample) {
        if self.strokes.iter().any(|s| s.pointer_id == pointer_id && !s.lifted) {
            self.pointer_move(pointer_id, sample);
            return;
        }
        if self.strokes.len() >= 2 {
            tracing::trace!("Ignoring pointer {pointer_id}: two strokes already captured");
            return;
        }
        let mut stroke = ActiveStroke {
            pointer_id,
            samples: VecDeque::with_capacity(self.max_points.min(128)),
            lifted: false,
        };
        stroke.push(sample, self.max_points);
        self.strokes.push(stroke);
        self.peak_touches = self.peak_touches.max(self.active_pointers());
    }

    /// A pointer moved. Ignored for unknown or lifted pointers.
    pub fn pointer_move(&mut self, pointer_id: u32, sample: Sample) {
        let cap = self.max_points;
        if let Some(stroke) = self
            .strokes
            .iter_mut()
            .find(|s| s.pointer_id == pointer_id && !s.lifted)
        {
            stroke.push(sample, cap);
        }
    }

    /// A pointer lifted, optionally reporting its final position.
    ///
    /// Returns the captured gesture once every pointer has lifted.
    pub fn pointer_up(&mut self, pointer_id: u32, sample: Option<Sample>) -> Option<CapturedGesture> {
        let cap = self.max_points;
        let stroke = self
            .strokes
            .iter_mut()
            .find(|s| s.pointer_id == pointer_id && !s.lifted)?;
        if let Some(sample) = sample {
            stroke.push(sample, cap);
        }
        stroke.lifted = true;
        if self.strokes.iter().all(|s| s.lifted) {
            self.finish()
        } else {
            None
        }
    }

    /// Feed a touch event. Returns a gesture when the last finger lifts.
    pub fn process_touch(&mut self, event: &TouchEvent) -> Option<CapturedGesture> {
        let t = event.timestamp_ms;
        match event.phase {
            TouchPhase::Start => {
                for touch in &event.touches {
                    self.pointer_down(touch.id, touch.to_sample(t));
                }
                None
            }
            TouchPhase::Move => {
                for touch in &event.touches {
                    self.pointer_move(touch.id, touch.to_sample(t));
                }
                None
            }
            TouchPhase::End => {
                let mut finished = None;
                for touch in &event.touches {
                    if let Some(gesture) = self.pointer_up(touch.id, Some(touch.to_sample(t))) {
                        finished = Some(gesture);
                    }
                }
                finished
            }
            TouchPhase::Cancel => {
                self.cancel();
                None
            }
        }
    }

    fn finish(&mut self) -> Option<CapturedGesture> {
        if self.strokes.is_empty() {
            return None;
        }
        let touch_count = self.peak_touches.max(1);
        let mut strokes = std::mem::take(&mut self.strokes).into_iter();
        self.peak_touches = 0;
        let primary = strokes.next()?.into_stroke();
        let secondary = strokes.next().map(ActiveStroke::into_stroke);
        Some(CapturedGesture {
            primary,
            secondary,
            touch_count,
        })
    }
}

impl Default for StrokeCapture {
    fn default() -> Self {
        Self::new(crate::config::CaptureConfig::default().max_stroke_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TouchPoint;

    fn sample(x: f64, t: u64) -> Sample {
        Sample::new(x, 0.0, t)
    }

    #[test]
    fn test_single_stroke_lifecycle() {
        let mut capture = StrokeCapture::new(10);
        assert!(!capture.is_capturing());

        capture.begin_stroke(sample(0.0, 0));
        capture.append_sample(sample(1.0, 10));
        capture.append_sample(sample(2.0, 20));
        assert!(capture.is_capturing());

        let gesture = capture.end_stroke().unwrap();
        assert_eq!(gesture.primary.len(), 3);
        assert_eq!(gesture.touch_count, 1);
        assert!(gesture.secondary.is_none());
        assert!(!capture.is_capturing());
    }

    #[test]
    fn test_append_without_stroke_is_noop() {
        let mut capture = StrokeCapture::new(10);
        capture.append_sample(sample(1.0, 0));
        assert!(!capture.is_capturing());
        assert!(capture.end_stroke().is_none());
    }

    #[test]
    fn test_sliding_window_drops_oldest() {
        let mut capture = StrokeCapture::new(4);
        capture.begin_stroke(sample(0.0, 0));
        for i in 1..10u32 {
            capture.append_sample(sample(f64::from(i), u64::from(i)));
        }
        assert_eq!(capture.buffered(), 4);
        let gesture = capture.end_stroke().unwrap();
        let xs: Vec<f64> = gesture.primary.samples().iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_begin_clears_stale_buffer() {
        let mut capture = StrokeCapture::new(10);
        capture.begin_stroke(sample(0.0, 0));
        capture.append_sample(sample(1.0, 1));
        capture.begin_stroke(sample(50.0, 100));
        let gesture = capture.end_stroke().unwrap();
        assert_eq!(gesture.primary.len(), 1);
        assert!((gesture.primary.start().unwrap().x - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_out_of_order_timestamps_tolerated() {
        let mut capture = StrokeCapture::new(10);
        capture.begin_stroke(sample(0.0, 100));
        capture.append_sample(sample(1.0, 50));
        capture.append_sample(sample(2.0, 50));
        let gesture = capture.end_stroke().unwrap();
        assert_eq!(gesture.primary.len(), 3);
    }

    #[test]
    fn test_cancel_discards() {
        let mut capture = StrokeCapture::new(10);
        capture.begin_stroke(sample(0.0, 0));
        capture.cancel();
        assert!(capture.end_stroke().is_none());
    }

    #[test]
    fn test_two_finger_pair() {
        let mut capture = StrokeCapture::new(10);
        capture.pointer_down(1, Sample::new(100.0, 100.0, 0));
        capture.pointer_down(2, Sample::new(200.0, 100.0, 5));
        assert_eq!(capture.active_pointers(), 2);
        capture.pointer_move(1, Sample::new(50.0, 100.0, 20));
        capture.pointer_move(2, Sample::new(250.0, 100.0, 20));

        assert!(capture.pointer_up(1, None).is_none());
        let gesture = capture.pointer_up(2, None).unwrap();
        assert_eq!(gesture.touch_count, 2);

        let pair = gesture.touch_pair().unwrap();
        assert!((pair.first.start().unwrap().x - 100.0).abs() < f64::EPSILON);
        assert!((pair.second.current().unwrap().x - 250.0).abs() < f64::EPSILON);
        assert_eq!(gesture.strokes().map(Stroke::len).sum::<usize>(), 4);
    }

    #[test]
    fn test_third_pointer_ignored() {
        let mut capture = StrokeCapture::new(10);
        capture.pointer_down(1, sample(0.0, 0));
        capture.pointer_down(2, sample(10.0, 0));
        capture.pointer_down(3, sample(20.0, 0));
        assert_eq!(capture.active_pointers(), 2);
        capture.pointer_move(3, sample(25.0, 5));
        let gesture = capture.end_stroke().unwrap();
        assert_eq!(gesture.touch_count, 2);
        assert_eq!(gesture.strokes().count(), 1);
        assert_eq!(gesture.primary.len(), 2);
    }

    #[test]
    fn test_process_touch_events() {
        let mut capture = StrokeCapture::new(10);
        let start = TouchEvent::single(TouchPhase::Start, 0.0, 0.0, 0);
        let moved = TouchEvent::single(TouchPhase::Move, 10.0, 0.0, 16);
        let end = TouchEvent::single(TouchPhase::End, 20.0, 0.0, 32);

        assert!(capture.process_touch(&start).is_none());
        assert!(capture.process_touch(&moved).is_none());
        let gesture = capture.process_touch(&end).unwrap();
        assert_eq!(gesture.primary.len(), 3);
    }

    #[test]
    fn test_process_touch_cancel() {
        let mut capture = StrokeCapture::new(10);
        capture.process_touch(&TouchEvent::single(TouchPhase::Start, 0.0, 0.0, 0));
        let cancel = TouchEvent::new(TouchPhase::Cancel, vec![TouchPoint { id: 0, x: 0.0, y: 0.0 }], 5);
        assert!(capture.process_touch(&cancel).is_none());
        assert!(!capture.is_capturing());
    }
}
