//! Processor execution tracing.
//!
//! Trait-based tracing with zero-cost abstraction: with [`NoopTracer`] every
//! hook compiles away entirely via monomorphization, the same way the
//! teacher's `VmTracer` is documented to. `Processor` is generic over
//! `Tr: ProcessorTracer`, chosen at construction time.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (default) |
//! | [`StderrTracer`] | Human-readable execution log to stderr |
//! | [`ProfilingTracer`] | Opcode frequency counters and max frame depth |
//! | [`RecordingTracer`] | Full event recording for post-mortem inspection |

use crate::opcode::Opcode;

/// One traced event during a Processor run.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    /// An opcode was dispatched at the given program counter.
    Dispatch { ip: usize, opcode: Opcode, frame_depth: usize },
    /// `call`/`distribute`/`mappedType` pushed a new frame.
    Call { target: usize, frame_depth: usize },
    /// `return` popped a frame.
    Return { frame_depth: usize },
    /// The Processor Registry served an in-flight anchor instead of recursing.
    CycleBroken { frame_depth: usize },
}

/// Hook points a Processor calls into during a run.
pub trait ProcessorTracer {
    fn on_dispatch(&mut self, _ip: usize, _opcode: Opcode, _frame_depth: usize) {}
    fn on_call(&mut self, _target: usize, _frame_depth: usize) {}
    fn on_return(&mut self, _frame_depth: usize) {}
    fn on_cycle_broken(&mut self, _frame_depth: usize) {}
}

/// Production default: every hook is an empty inlinable function.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl ProcessorTracer for NoopTracer {}

/// Logs every hook to stderr as it happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl ProcessorTracer for StderrTracer {
    fn on_dispatch(&mut self, ip: usize, opcode: Opcode, frame_depth: usize) {
        eprintln!("[rvm] {ip:>4} {opcode:<20} depth={frame_depth}");
    }

    fn on_call(&mut self, target: usize, frame_depth: usize) {
        eprintln!("[rvm]      -> call target={target} depth={frame_depth}");
    }

    fn on_return(&mut self, frame_depth: usize) {
        eprintln!("[rvm]      <- return depth={frame_depth}");
    }

    fn on_cycle_broken(&mut self, frame_depth: usize) {
        eprintln!("[rvm]      == cycle broken at depth={frame_depth}");
    }
}

/// Opcode frequency counters and the deepest frame depth reached.
#[derive(Debug, Clone, Default)]
pub struct ProfilingTracer {
    pub dispatch_counts: std::collections::BTreeMap<&'static str, usize>,
    pub max_frame_depth: usize,
    pub calls: usize,
    pub cycles_broken: usize,
}

impl ProfilingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessorTracer for ProfilingTracer {
    fn on_dispatch(&mut self, _ip: usize, opcode: Opcode, frame_depth: usize) {
        *self.dispatch_counts.entry(opcode.into()).or_insert(0) += 1;
        self.max_frame_depth = self.max_frame_depth.max(frame_depth);
    }

    fn on_call(&mut self, _target: usize, _frame_depth: usize) {
        self.calls += 1;
    }

    fn on_cycle_broken(&mut self, _frame_depth: usize) {
        self.cycles_broken += 1;
    }
}

/// Records every hook invocation in order, for post-mortem inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    pub events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessorTracer for RecordingTracer {
    fn on_dispatch(&mut self, ip: usize, opcode: Opcode, frame_depth: usize) {
        self.events.push(TraceEvent::Dispatch { ip, opcode, frame_depth });
    }

    fn on_call(&mut self, target: usize, frame_depth: usize) {
        self.events.push(TraceEvent::Call { target, frame_depth });
    }

    fn on_return(&mut self, frame_depth: usize) {
        self.events.push(TraceEvent::Return { frame_depth });
    }

    fn on_cycle_broken(&mut self, frame_depth: usize) {
        self.events.push(TraceEvent::CycleBroken { frame_depth });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiling_tracer_counts_dispatches_by_opcode_name() {
        let mut tracer = ProfilingTracer::new();
        tracer.on_dispatch(0, Opcode::String, 1);
        tracer.on_dispatch(1, Opcode::String, 1);
        tracer.on_dispatch(2, Opcode::Union, 1);
        assert_eq!(tracer.dispatch_counts.get("String"), Some(&2));
        assert_eq!(tracer.dispatch_counts.get("Union"), Some(&1));
    }

    #[test]
    fn recording_tracer_preserves_event_order() {
        let mut tracer = RecordingTracer::new();
        tracer.on_call(5, 1);
        tracer.on_return(0);
        assert_eq!(tracer.events.len(), 2);
        assert!(matches!(tracer.events[0], TraceEvent::Call { target: 5, frame_depth: 1 }));
    }
}
