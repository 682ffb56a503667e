//! Test doubles for the syscall layer's collaborators.
//!
//! [`Harness`] wires an in-memory filesystem, a scripted console, a fake
//! power switch and a loader into a private [`Kernel`], and builds user
//! processes with a fixed memory layout:
//!
//! ```text
//! 0x0804_8000  text   (1 page, executable, read-only)
//! 0x1000_0000  data   (2 pages, writable; second page holds test strings)
//! 0xBFFF_F000  stack  (1 page, writable; syscalls are pushed at 0xBFFF_FF00)
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::string::{String, ToString};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::vec::Vec;

use spin::Mutex;

use crate::drivers::{Console, Power};
use crate::fs::{File, FileHandle, Filesystem, FsLock, InodeId};
use crate::kernel::Kernel;
use crate::mm::{AddressSpace, MapFlags, UserAddr, UserPageTable, PAGE_SIZE};
use crate::process::{Child, Loader, Pid, Process};
use crate::syscall::args::Word;
use crate::syscall::{dispatch, Disposition};
use crate::trap::TrapFrame;

/// Start of the read-only text page.
pub const TEXT_BASE: u32 = 0x0804_8000;
/// Start of the two writable data pages.
pub const DATA_BASE: u32 = 0x1000_0000;
/// Start of the stack page.
pub const STACK_BASE: u32 = 0xBFFF_F000;
/// Stack pointer at which syscall frames are pushed.
pub const STACK_TOP: u32 = 0xBFFF_FF00;

const STRINGS_BASE: u32 = DATA_BASE + PAGE_SIZE as u32;
const STRINGS_END: u32 = DATA_BASE + 2 * PAGE_SIZE as u32;

/// Marker left in `eax` to detect calls that store no result.
const EAX_UNTOUCHED: u32 = 0xDEAD_BEEF;

/// Address space with the standard test layout.
pub fn user_layout() -> UserPageTable {
    let mut space = UserPageTable::new();
    let pages = [
        (TEXT_BASE, MapFlags::EXECUTABLE),
        (DATA_BASE, MapFlags::WRITABLE),
        (STRINGS_BASE, MapFlags::WRITABLE),
        (STACK_BASE, MapFlags::WRITABLE),
    ];
    for (base, flags) in pages {
        space.map(UserAddr::new(base), flags).unwrap();
    }
    space
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

struct Inode {
    id: InodeId,
    data: Mutex<Vec<u8>>,
    deny_count: AtomicUsize,
    handles: AtomicUsize,
}

#[derive(Default)]
struct FsState {
    files: BTreeMap<String, Arc<Inode>>,
    next_inode: u32,
}

/// In-memory filesystem. Clones share the same files.
#[derive(Clone, Default)]
pub struct MemFs {
    state: Arc<Mutex<FsState>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace `name` with the given contents.
    pub fn install(&self, name: &str, bytes: &[u8]) {
        let mut state = self.state.lock();
        state.next_inode += 1;
        let inode = Arc::new(Inode {
            id: InodeId(state.next_inode),
            data: Mutex::new(bytes.to_vec()),
            deny_count: AtomicUsize::new(0),
            handles: AtomicUsize::new(0),
        });
        state.files.insert(name.to_string(), inode);
    }

    fn inode(&self, name: &str) -> Option<Arc<Inode>> {
        self.state.lock().files.get(name).cloned()
    }

    /// Current contents of `name`; empty if it does not exist.
    pub fn contents(&self, name: &str) -> Vec<u8> {
        match self.inode(name) {
            Some(inode) => {
                let data = inode.data.lock();
                data.clone()
            }
            None => Vec::new(),
        }
    }

    /// Number of open handles on `name`.
    pub fn open_handles(&self, name: &str) -> usize {
        self.inode(name)
            .map_or(0, |inode| inode.handles.load(Ordering::SeqCst))
    }

    /// Whether some handle currently denies writes to `name`.
    pub fn write_denied(&self, name: &str) -> bool {
        self.inode(name)
            .is_some_and(|inode| inode.deny_count.load(Ordering::SeqCst) > 0)
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }
}

impl Filesystem for MemFs {
    fn create(&mut self, name: &str, initial_size: u32) -> bool {
        if name.is_empty() || self.inode(name).is_some() {
            return false;
        }
        self.install(name, &vec![0; initial_size as usize]);
        true
    }

    fn open(&mut self, name: &str) -> Option<FileHandle> {
        let inode = self.inode(name)?;
        inode.handles.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MemFile {
            inode,
            pos: 0,
            denied: false,
        }))
    }

    fn remove(&mut self, name: &str) -> bool {
        self.state.lock().files.remove(name).is_some()
    }
}

struct MemFile {
    inode: Arc<Inode>,
    pos: u32,
    denied: bool,
}

impl File for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let data = self.inode.data.lock();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u32;
        n
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        if self.inode.deny_count.load(Ordering::SeqCst) > 0 {
            return 0;
        }
        let mut data = self.inode.data.lock();
        let start = self.pos as usize;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        self.pos = end as u32;
        bytes.len()
    }

    fn length(&self) -> u32 {
        self.inode.data.lock().len() as u32
    }

    fn tell(&self) -> u32 {
        self.pos
    }

    fn seek(&mut self, pos: u32) {
        self.pos = pos;
    }

    fn deny_write(&mut self) {
        if !self.denied {
            self.denied = true;
            self.inode.deny_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn allow_write(&mut self) {
        if self.denied {
            self.denied = false;
            self.inode.deny_count.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn inode(&self) -> InodeId {
        self.inode.id
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        self.allow_write();
        self.inode.handles.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Console fed from a key script, recording everything written.
#[derive(Default)]
pub struct ScriptedConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
    writes: AtomicUsize,
}

impl ScriptedConsole {
    /// Queue keystrokes for `get_char`.
    pub fn type_keys(&self, keys: &[u8]) {
        self.input.lock().extend(keys.iter().copied());
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock()).into_owned()
    }

    /// Number of `put_buffer` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Console for ScriptedConsole {
    fn get_char(&self) -> u8 {
        // An exhausted script behaves like a user pressing enter.
        self.input.lock().pop_front().unwrap_or(b'\n')
    }

    fn put_buffer(&self, bytes: &[u8]) {
        self.output.lock().extend_from_slice(bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct PowerSwitch;

impl Power for PowerSwitch {
    fn power_off(&self) -> ! {
        panic!("power off");
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Loader that "starts" programs by building a [`Process`] and parking it
/// for the test to drive.
pub struct TestLoader {
    pids: Arc<AtomicI32>,
    launches: AtomicUsize,
    spawned: Mutex<Vec<Process>>,
}

impl TestLoader {
    fn new(pids: Arc<AtomicI32>) -> Self {
        Self {
            pids,
            launches: AtomicUsize::new(0),
            spawned: Mutex::new(Vec::new()),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Hand over a started child so the test can run it.
    pub fn take_spawned(&self, pid: i32) -> Option<Process> {
        let mut spawned = self.spawned.lock();
        let idx = spawned.iter().position(|p| p.pid().as_i32() == pid)?;
        Some(spawned.remove(idx))
    }
}

impl Loader for TestLoader {
    fn execute(&self, fs: &FsLock, cmdline: &str) -> Option<Child> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let name = cmdline.split_whitespace().next()?;
        let mut exe = fs.lock().open(name)?;
        exe.deny_write();

        let pid = Pid::new(self.pids.fetch_add(1, Ordering::SeqCst));
        let process = Process::new(pid, name, Box::new(user_layout()), Some(exe));
        let child = process.as_child();
        self.spawned.lock().push(process);
        Some(child)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A private kernel plus handles on all of its fakes.
pub struct Harness {
    pub kernel: Kernel,
    pub console: Arc<ScriptedConsole>,
    pub fs: MemFs,
    pub loader: Arc<TestLoader>,
    pids: Arc<AtomicI32>,
    next_string: AtomicU32,
}

impl Harness {
    pub fn new() -> Self {
        let fs = MemFs::new();
        let console = Arc::new(ScriptedConsole::default());
        let pids = Arc::new(AtomicI32::new(1));
        let loader = Arc::new(TestLoader::new(Arc::clone(&pids)));
        let kernel = Kernel::new(
            Box::new(fs.clone()),
            console.clone(),
            loader.clone(),
            Arc::new(PowerSwitch),
        );
        Self {
            kernel,
            console,
            fs,
            loader,
            pids,
            next_string: AtomicU32::new(STRINGS_BASE),
        }
    }

    /// Another kernel over the same fakes.
    pub fn build_kernel(&self) -> Kernel {
        Kernel::new(
            Box::new(self.fs.clone()),
            self.console.clone(),
            self.loader.clone(),
            Arc::new(PowerSwitch),
        )
    }

    fn next_pid(&self) -> Pid {
        Pid::new(self.pids.fetch_add(1, Ordering::SeqCst))
    }

    /// A process with no program image.
    pub fn process(&self, name: &str) -> Process {
        Process::new(self.next_pid(), name, Box::new(user_layout()), None)
    }

    /// A process running the installed file `name`, which stays
    /// write-denied while the process lives.
    pub fn process_from_image(&self, name: &str) -> Process {
        let mut exe = self.kernel.fs().lock().open(name).unwrap();
        exe.deny_write();
        Process::new(self.next_pid(), name, Box::new(user_layout()), Some(exe))
    }

    /// Copy `bytes` into the process's string page; returns their address.
    pub fn put_bytes(&self, p: &mut Process, bytes: &[u8]) -> u32 {
        let len = bytes.len() as u32;
        let addr = self.next_string.fetch_add(len, Ordering::SeqCst);
        assert!(addr + len <= STRINGS_END, "test string page exhausted");
        p.space_mut().write(UserAddr::new(addr), bytes).unwrap();
        addr
    }

    /// Copy a NUL-terminated string into user memory.
    pub fn put_str(&self, p: &mut Process, s: &str) -> u32 {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.put_bytes(p, &bytes)
    }

    pub fn read_bytes(&self, p: &Process, addr: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        p.space().read(UserAddr::new(addr), &mut buf).unwrap();
        buf
    }

    /// Lay out a syscall frame on the user stack; returns the stack pointer.
    pub fn push_call(&self, p: &mut Process, nr: u32, args: &[Word]) -> u32 {
        let mut frame = nr.to_le_bytes().to_vec();
        for arg in args {
            frame.extend_from_slice(&arg.to_le_bytes());
        }
        p.space_mut().write(UserAddr::new(STACK_TOP), &frame).unwrap();
        STACK_TOP
    }

    /// Trap into the kernel; returns the disposition and the result register.
    pub fn call(&self, p: &mut Process, nr: u32, args: &[Word]) -> (Disposition, i32) {
        let mut frame = TrapFrame::new(self.push_call(p, nr, args));
        frame.eax = EAX_UNTOUCHED;
        let disposition = dispatch(&self.kernel, p, &mut frame);
        (disposition, frame.eax as i32)
    }

    /// Trap for a call that stores no result.
    pub fn call_void(&self, p: &mut Process, nr: u32, args: &[Word]) -> Disposition {
        let (disposition, eax) = self.call(p, nr, args);
        assert_eq!(eax as u32, EAX_UNTOUCHED, "syscall {} stored a result", nr);
        disposition
    }
}
