pub mod time;

use nanoid::nanoid;

/// Generate a unique id for nodes and edges created at runtime.
pub fn longid() -> String {
    nanoid!()
}
