use std::rc::Rc;

use rube_core::location::Location;

use crate::error::FatalError;
use crate::heap::ObjectId;
use crate::runtime::Runtime;
use crate::scope::FrameId;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// The kind of a call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A method defined in the object language.
    Method,
    /// A native primitive (not shown in backtraces).
    Primitive,
    /// A block or a lambda.
    Block,
}

/// Represents an invocation currently on the call stack.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The identity of the invocation.
    pub id: FrameId,
    /// What backtraces call this frame (eg. `greet` or `block in greet`).
    pub label: Rc<str>,
    /// The module holding the invoked method, if it is a method.
    pub holder: Option<ObjectId>,
    /// Where the invocation happened.
    pub call_site: Location,
    /// The kind of invocation.
    pub kind: FrameKind,
    /// The block given to the invocation.
    pub block: Option<Value>,
}

impl Runtime {
    /// Execute a piece of code within a new call frame.
    ///
    /// The frame is popped once `func` returns, whatever it returns.
    pub fn with_call_frame<T>(
        &mut self,
        label: Rc<str>,
        holder: Option<ObjectId>,
        kind: FrameKind,
        block: Option<Value>,
        func: impl FnOnce(&mut Runtime, FrameId) -> Result<T, FatalError>,
    ) -> Result<T, FatalError> {
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(FatalError::StackDepthExceeded(self.call_stack.len()));
        }
        self.next_frame += 1;
        let id = FrameId(self.next_frame);
        let call_site = self.current_location();
        self.call_stack.push(CallFrame {
            id,
            label,
            holder,
            call_site,
            kind,
            block,
        });
        let ret = ensure_sufficient_stack(|| func(self, id));
        self.call_stack.pop();
        ret
    }

    /// Execute a piece of code with a location pushed on the evaluation stack.
    pub fn with_location<T>(&mut self, location: &Location, func: impl FnOnce(&mut Runtime) -> T) -> T {
        self.eval_stack.push(location.clone());
        let ret = func(self);
        self.eval_stack.pop();
        ret
    }

    /// Get the location of the node currently being evaluated.
    pub fn current_location(&self) -> Location {
        self.eval_stack.last().cloned().unwrap_or_default()
    }

    /// Get the label of the innermost frame that is not a primitive.
    pub fn current_label(&self) -> Rc<str> {
        self.call_stack
            .iter()
            .rev()
            .find(|frame| frame.kind != FrameKind::Primitive)
            .map(|frame| frame.label.clone())
            .unwrap_or_else(|| Rc::from("<main>"))
    }

    /// Get the block given to the innermost running method.
    pub fn method_block(&self) -> Option<Value> {
        self.call_stack
            .iter()
            .rev()
            .find(|frame| frame.kind == FrameKind::Method)
            .and_then(|frame| frame.block.clone())
    }

    /// Whether the given invocation is still running (the top-level frame always is).
    pub fn is_frame_live(&self, frame: FrameId) -> bool {
        frame == FrameId::TOP_LEVEL || self.call_stack.iter().any(|live| live.id == frame)
    }

    /// Get the current call depth.
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Build a backtrace of the current state of execution, innermost call first.
    ///
    /// Each line reads `file:line:in 'label'`.
    pub fn backtrace(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut location = self.current_location();
        for frame in self.call_stack.iter().rev() {
            if frame.kind == FrameKind::Primitive {
                continue;
            }
            lines.push(format_line(&location, &frame.label));
            location = frame.call_site.clone();
        }
        lines.push(format_line(&location, "<main>"));
        lines
    }
}

fn format_line(location: &Location, label: &str) -> String {
    format!("{}:{}:in '{}'", location.file, location.line, label)
}
