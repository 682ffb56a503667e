//! User Processes
//!
//! A [`Process`] is everything the syscall layer knows about a running
//! user program: its address space, its descriptor table, the file backing
//! its image, and the exit/wait record it shares with its parent.
//!
//! Creating a process image is the loader's job. The loader hands back a
//! [`Child`], which the parent keeps until it reaps it with `wait`.

pub mod fd;
pub mod lifecycle;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use log::{debug, info};

use crate::fs::{FileHandle, FsLock, InodeId};
use crate::kernel::Kernel;
use crate::mm::AddressSpace;

pub use fd::{Fd, FdError, FdTable, FD_CAPACITY};
pub use lifecycle::Lifecycle;

/// Exit status of a process killed by the kernel.
pub const EXIT_FAILURE: i32 = -1;

/// Process identifier, shared with the kernel thread id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(i32);

impl Pid {
    /// Returned to user space when no process could be created.
    pub const ERROR: Self = Self(-1);

    /// Create a process id.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// The value handed back to user space.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A freshly started child, as reported by the loader.
#[derive(Debug, Clone)]
pub struct Child {
    /// Id of the new process.
    pub pid: Pid,
    /// Exit/wait record shared with the new process.
    pub lifecycle: Arc<Lifecycle>,
}

/// The program loader collaborator.
pub trait Loader: Send + Sync {
    /// Start a new process running `cmdline`.
    ///
    /// The loader opens the executable through `fs` and must deny writes to
    /// it for as long as the child runs. Returns `None` if the program
    /// cannot be started.
    fn execute(&self, fs: &FsLock, cmdline: &str) -> Option<Child>;
}

/// A user process.
pub struct Process {
    pid: Pid,
    name: String,
    space: Box<dyn AddressSpace>,
    files: FdTable,
    executable: Option<FileHandle>,
    lifecycle: Arc<Lifecycle>,
    children: BTreeMap<Pid, Arc<Lifecycle>>,
}

impl Process {
    /// Create a process.
    ///
    /// `executable` is the open handle on the program image, if any; the
    /// caller is expected to have denied writes on it already.
    pub fn new(
        pid: Pid,
        name: &str,
        space: Box<dyn AddressSpace>,
        executable: Option<FileHandle>,
    ) -> Self {
        Self {
            pid,
            name: String::from(name),
            space,
            files: FdTable::new(),
            executable,
            lifecycle: Arc::new(Lifecycle::new()),
            children: BTreeMap::new(),
        }
    }

    /// Process id.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Program name, as printed in the termination record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The user address space.
    pub fn space(&self) -> &dyn AddressSpace {
        &*self.space
    }

    /// The user address space, mutably.
    pub fn space_mut(&mut self) -> &mut dyn AddressSpace {
        &mut *self.space
    }

    /// The descriptor table.
    pub fn files(&self) -> &FdTable {
        &self.files
    }

    /// The descriptor table, mutably.
    pub fn files_mut(&mut self) -> &mut FdTable {
        &mut self.files
    }

    /// Inode of the running program image.
    pub fn executable_inode(&self) -> Option<InodeId> {
        self.executable.as_ref().map(|exe| exe.inode())
    }

    /// This process's exit/wait record.
    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// The handle a loader returns to the parent.
    pub fn as_child(&self) -> Child {
        Child {
            pid: self.pid,
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Start tracking a child created by `exec`.
    pub fn adopt(&mut self, child: Child) {
        debug!("[PROCESS] {} adopts child {}", self.pid, child.pid);
        self.children.insert(child.pid, child.lifecycle);
    }

    /// Detach a child so it can be waited for exactly once.
    pub fn reap(&mut self, pid: Pid) -> Option<Arc<Lifecycle>> {
        self.children.remove(&pid)
    }

    /// Check if `pid` is an un-reaped child of this process.
    pub fn has_child(&self, pid: Pid) -> bool {
        self.children.contains_key(&pid)
    }

    /// Terminate the process.
    ///
    /// Records `status` (unless an earlier exit already did), closes every
    /// descriptor and the program image, prints the termination record and
    /// raises the completion signal. Repeated calls only return the status
    /// already on record. The caller must not run the process again.
    pub fn exit(&mut self, kernel: &Kernel, status: i32) -> i32 {
        if self.lifecycle.has_completed() {
            return self.lifecycle.exit_status().unwrap_or(status);
        }
        let status = self.lifecycle.record_exit(status);

        {
            let _fs = kernel.fs().lock();
            let closed = self.files.close_all();
            if let Some(mut exe) = self.executable.take() {
                exe.allow_write();
            }
            debug!("[PROCESS] {}: closed {} descriptors", self.pid, closed);
        }
        // Children keep running; their records die with the last reference.
        self.children.clear();

        let record = format!("{}: exit({})\n", self.name, status);
        kernel.console().put_buffer(record.as_bytes());
        info!("[PROCESS] {} ({}) exited with status {}", self.name, self.pid, status);

        self.lifecycle.signal_completion();
        status
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("files", &self.files)
            .field("children", &self.children.keys())
            .field("exited", &self.lifecycle.exit_status())
            .finish()
    }
}
