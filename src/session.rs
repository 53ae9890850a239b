//! Per-connection open context.
//!
//! Each connection owns one `Session`: a private read position into the
//! shared device and a set of read/write permissions. Sessions are never
//! shared between connections, so they need no locking.

/// Access kind checked by READ and WRITE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Permission set of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    read: bool,
    write: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}

impl Permissions {
    pub fn allows(&self, access: Access) -> bool {
        match access {
            Access::Read => self.read,
            Access::Write => self.write,
        }
    }

    pub fn grant(&mut self, access: Access) {
        self.set(access, true);
    }

    pub fn revoke(&mut self, access: Access) {
        self.set(access, false);
    }

    fn set(&mut self, access: Access, value: bool) {
        match access {
            Access::Read => self.read = value,
            Access::Write => self.write = value,
        }
    }

    /// Permission letters as shown by STATUS ("RW", "R", "W" or "")
    pub fn letters(&self) -> String {
        let mut letters = String::with_capacity(2);
        if self.read {
            letters.push('R');
        }
        if self.write {
            letters.push('W');
        }
        letters
    }
}

/// Client session state
#[derive(Debug, Default)]
pub struct Session {
    /// Read offset into the device
    pub position: usize,
    pub permissions: Permissions,
}

impl Session {
    /// Create a session at position 0 with read and write granted
    pub fn new() -> Self {
        Self::default()
    }
}
