use std::cell::RefCell;
use std::rc::Rc;

/// Where `puts`, `print` and `p` write to.
#[derive(Debug, Clone)]
pub enum Output {
    /// The process' standard output.
    Stdout,
    /// An in-memory buffer, shared with the host.
    Buffer(Rc<RefCell<String>>),
}

impl Output {
    /// Create a fresh buffered output, along with a handle to read it back.
    pub fn buffer() -> (Self, Rc<RefCell<String>>) {
        let buffer = Rc::new(RefCell::new(String::new()));
        (Self::Buffer(buffer.clone()), buffer)
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::Stdout
    }
}

/// The interpreter's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The maximum number of nested calls before the run is aborted.
    pub max_call_depth: usize,
    /// Where output goes.
    pub output: Output,
}

impl Config {
    /// The default maximum number of nested calls.
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

    /// Set the maximum number of nested calls.
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Set where output goes.
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            output: Output::default(),
        }
    }
}
