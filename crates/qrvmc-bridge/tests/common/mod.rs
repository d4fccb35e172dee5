//! Test doubles: a mock linker and stub VMs implemented as `extern "C"` code.
//!
//! Stub VMs pick their behavior from the selector prefix:
//!
//! | selector      | behavior                                         |
//! |---------------|--------------------------------------------------|
//! | `fail:...`    | creation fails with a message                    |
//! | `silent:...`  | creation fails without code or message           |
//! | `noopts:...`  | VM without `set_option`                          |
//! | `nameless:...`| VM with an empty name                            |
//! | `abi9:...`    | VM reporting ABI version 9                       |
//! | anything else | regular VM                                       |
//!
//! Stub bytecode, one opcode per byte:
//!
//! | op   | effect                                                  |
//! |------|---------------------------------------------------------|
//! | 0x01 | get_storage(recipient, 0) then set_storage(+1)          |
//! | 0x02 | emit_log(recipient, input)                              |
//! | 0x03 | host call with the same input at depth + 1              |
//! | 0x04 | sleep 20ms                                              |
//! | 0x05 | account_exists(sender)                                  |
//! | 0x06 | get_tx_context                                          |
//! | 0xfd | stop with REVERT                                        |

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};
use std::time::Duration;

use qrvmc_bridge::ffi;
use qrvmc_bridge::{
    ConnectorEntryPoints, ConnectorModule, EmbeddedResources, LibraryResolver, LinkError, Linker,
    ModuleOrigin, ResolverConfig,
};

pub const BUNDLED_BYTES: &[u8] = b"\x7fELF stub connector";
pub const SYSTEM_ERROR: &str =
    "libqrvmc.so: cannot open shared object file: No such file or directory";

// =============================================================================
// Mock linker
// =============================================================================

#[derive(Default)]
pub struct LinkerState {
    fail_system: bool,
    fail_path: bool,
    delay: Duration,
    pub system_attempts: AtomicUsize,
    pub path_attempts: AtomicUsize,
    /// Paths opened by `open_path` with the file contents seen at load time.
    pub loaded: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

#[derive(Clone, Default)]
pub struct MockLinker {
    pub state: Arc<LinkerState>,
}

impl MockLinker {
    fn with(fail_system: bool, fail_path: bool) -> Self {
        Self {
            state: Arc::new(LinkerState {
                fail_system,
                fail_path,
                ..Default::default()
            }),
        }
    }

    /// The binding is found on the system search path.
    pub fn system() -> Self {
        Self::with(false, false)
    }

    /// Only the extracted copy loads.
    pub fn bundled() -> Self {
        Self::with(true, false)
    }

    /// Nothing loads.
    pub fn unloadable() -> Self {
        Self::with(true, true)
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.state) {
            state.delay = delay;
        }
        self
    }

    pub fn system_attempts(&self) -> usize {
        self.state.system_attempts.load(Ordering::SeqCst)
    }

    pub fn path_attempts(&self) -> usize {
        self.state.path_attempts.load(Ordering::SeqCst)
    }

    pub fn loaded(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.state.loaded.lock().unwrap().clone()
    }
}

impl Linker for MockLinker {
    fn open_system(&self, name: &str) -> Result<ConnectorModule, LinkError> {
        self.state.system_attempts.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.state.delay);
        if self.state.fail_system {
            return Err(LinkError(SYSTEM_ERROR.to_string()));
        }
        Ok(stub_module(ModuleOrigin::System(format!("lib{}.so", name))))
    }

    fn open_path(&self, path: &Path) -> Result<ConnectorModule, LinkError> {
        self.state.path_attempts.fetch_add(1, Ordering::SeqCst);
        let contents = std::fs::read(path).unwrap_or_default();
        self.state
            .loaded
            .lock()
            .unwrap()
            .push((path.to_path_buf(), contents));
        if self.state.fail_path {
            return Err(LinkError(format!("{}: invalid ELF header", path.display())));
        }
        Ok(stub_module(ModuleOrigin::Path(path.to_path_buf())))
    }
}

pub fn stub_module(origin: ModuleOrigin) -> ConnectorModule {
    ConnectorModule::from_entry_points(
        ConnectorEntryPoints {
            load_and_create: stub_load_and_create,
            last_error_msg: Some(stub_last_error_msg),
        },
        origin,
    )
}

pub fn config(temp_dir: &Path) -> ResolverConfig {
    ResolverConfig::default()
        .with_target_os("Linux")
        .with_temp_dir(temp_dir)
        .with_resources(EmbeddedResources::new().with("libqrvmc.so", BUNDLED_BYTES))
}

pub fn resolver(linker: &MockLinker, temp_dir: &Path) -> LibraryResolver {
    LibraryResolver::new(config(temp_dir), linker.clone())
}

// =============================================================================
// Stub VM state
// =============================================================================

/// Observable state of the stub VMs created for one selector.
#[derive(Default)]
pub struct StubState {
    pub capabilities: AtomicU32,
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub executions: AtomicUsize,
    pub interleaved: AtomicBool,
    /// Set when capabilities were read while another thread was inside `execute`.
    pub raced_introspection: AtomicBool,
    pub max_active: AtomicUsize,
    pub last_revision: AtomicI32,
    pub options: Mutex<Vec<(String, String)>>,
    active: AtomicUsize,
    owner: Mutex<Option<ThreadId>>,
}

impl StubState {
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn interleaved(&self) -> bool {
        self.interleaved.load(Ordering::SeqCst)
    }

    pub fn raced_introspection(&self) -> bool {
        self.raced_introspection.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> Vec<(String, String)> {
        self.options.lock().unwrap().clone()
    }

    /// Record entry into `execute`. Entry from a second thread while another
    /// thread is inside counts as interleaving; same-thread nesting does not.
    fn enter(&self) {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap();
        if self.active.load(Ordering::SeqCst) > 0 && *owner != Some(me) {
            self.interleaved.store(true, Ordering::SeqCst);
        }
        *owner = Some(me);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
    }

    fn running_elsewhere(&self) -> bool {
        let owner = self.owner.lock().unwrap();
        self.active.load(Ordering::SeqCst) > 0 && *owner != Some(thread::current().id())
    }

    fn leave(&self) {
        let mut owner = self.owner.lock().unwrap();
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            *owner = None;
        }
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<StubState>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<StubState>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// State shared by all stub VMs created with `selector`.
pub fn stub_state(selector: &str) -> Arc<StubState> {
    registry()
        .lock()
        .unwrap()
        .entry(selector.to_string())
        .or_insert_with(|| {
            let state = StubState::default();
            state
                .capabilities
                .store(ffi::QRVMC_CAPABILITY_QRVM1, Ordering::SeqCst);
            Arc::new(state)
        })
        .clone()
}

#[repr(C)]
struct StubVm {
    base: ffi::qrvmc_vm,
    state: Arc<StubState>,
}

unsafe fn stub<'a>(vm: *mut ffi::qrvmc_vm) -> &'a StubVm {
    unsafe { &*(vm as *const StubVm) }
}

// =============================================================================
// Binding entry points
// =============================================================================

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
    static RETURNED_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: String) {
    LAST_ERROR.with(|e| *e.borrow_mut() = CString::new(message).ok());
}

unsafe extern "C" fn stub_last_error_msg() -> *const c_char {
    let message = LAST_ERROR.with(|e| e.borrow_mut().take());
    RETURNED_ERROR.with(|r| {
        let mut returned = r.borrow_mut();
        *returned = message;
        returned.as_ref().map_or(ptr::null(), |m| m.as_ptr())
    })
}

unsafe extern "C" fn stub_load_and_create(
    selector: *const c_char,
    error_code: *mut ffi::qrvmc_loader_error_code,
) -> *mut ffi::qrvmc_vm {
    let selector = unsafe { CStr::from_ptr(selector) }
        .to_string_lossy()
        .into_owned();
    let prefix = selector.split(':').next().unwrap_or_default();

    let set_code = |code| {
        if !error_code.is_null() {
            unsafe { *error_code = code };
        }
    };

    match prefix {
        "fail" => {
            set_last_error(format!("creating QRVMC VM of {} has failed", selector));
            set_code(ffi::QRVMC_LOADER_VM_CREATION_FAILURE);
            return ptr::null_mut();
        }
        "silent" => return ptr::null_mut(),
        _ => {}
    }

    let state = stub_state(&selector);
    state.created.fetch_add(1, Ordering::SeqCst);

    let vm = Box::new(StubVm {
        base: ffi::qrvmc_vm {
            abi_version: if prefix == "abi9" { 9 } else { ffi::QRVMC_ABI_VERSION },
            name: if prefix == "nameless" {
                c"".as_ptr()
            } else {
                c"stub_vm".as_ptr()
            },
            version: c"0.1.0".as_ptr(),
            destroy: Some(stub_destroy),
            execute: Some(stub_execute),
            get_capabilities: Some(stub_get_capabilities),
            set_option: if prefix == "noopts" {
                None
            } else {
                Some(stub_set_option)
            },
        },
        state,
    });

    set_code(ffi::QRVMC_LOADER_SUCCESS);
    Box::into_raw(vm) as *mut ffi::qrvmc_vm
}

// =============================================================================
// VM functions
// =============================================================================

unsafe extern "C" fn stub_destroy(vm: *mut ffi::qrvmc_vm) {
    let vm = unsafe { Box::from_raw(vm as *mut StubVm) };
    vm.state.destroyed.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn stub_get_capabilities(vm: *mut ffi::qrvmc_vm) -> u32 {
    let state = &unsafe { stub(vm) }.state;
    if state.running_elsewhere() {
        state.raced_introspection.store(true, Ordering::SeqCst);
    }
    state.capabilities.load(Ordering::SeqCst)
}

unsafe extern "C" fn stub_set_option(
    vm: *mut ffi::qrvmc_vm,
    name: *const c_char,
    value: *const c_char,
) -> ffi::qrvmc_set_option_result {
    let state = &unsafe { stub(vm) }.state;
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    let value = unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned();

    let result = match (name.as_str(), value.as_str()) {
        ("precompiles", "on") => {
            state
                .capabilities
                .fetch_or(ffi::QRVMC_CAPABILITY_PRECOMPILES, Ordering::SeqCst);
            ffi::QRVMC_SET_OPTION_SUCCESS
        }
        ("precompiles", "off") => {
            state
                .capabilities
                .fetch_and(!ffi::QRVMC_CAPABILITY_PRECOMPILES, Ordering::SeqCst);
            ffi::QRVMC_SET_OPTION_SUCCESS
        }
        ("precompiles", _) => ffi::QRVMC_SET_OPTION_INVALID_VALUE,
        ("trace", _) | ("", _) => ffi::QRVMC_SET_OPTION_SUCCESS,
        ("broken", _) => 99,
        _ => ffi::QRVMC_SET_OPTION_INVALID_NAME,
    };

    if result == ffi::QRVMC_SET_OPTION_SUCCESS {
        state.options.lock().unwrap().push((name, value));
    }
    result
}

fn native_result(
    status: ffi::qrvmc_status_code,
    gas_left: i64,
    output: Vec<u8>,
) -> ffi::qrvmc_result {
    let (output_data, output_size) = if output.is_empty() {
        (ptr::null(), 0)
    } else {
        let boxed = output.into_boxed_slice();
        let size = boxed.len();
        (Box::into_raw(boxed) as *const u8, size)
    };
    ffi::qrvmc_result {
        status_code: status,
        gas_left,
        gas_refund: 0,
        output_data,
        output_size,
        release: Some(release_output),
        create_address: ffi::qrvmc_address::default(),
        padding: [0; 4],
    }
}

unsafe extern "C" fn release_output(result: *const ffi::qrvmc_result) {
    let result = unsafe { &*result };
    if !result.output_data.is_null() {
        let slice =
            ptr::slice_from_raw_parts_mut(result.output_data as *mut u8, result.output_size);
        drop(unsafe { Box::from_raw(slice) });
    }
}

unsafe extern "C" fn stub_execute(
    vm: *mut ffi::qrvmc_vm,
    host: *const ffi::qrvmc_host_interface,
    context: *mut ffi::qrvmc_host_context,
    rev: ffi::qrvmc_revision,
    msg: *const ffi::qrvmc_message,
    code: *const u8,
    code_size: usize,
) -> ffi::qrvmc_result {
    let state = &unsafe { stub(vm) }.state;
    let host = unsafe { &*host };
    let msg = unsafe { &*msg };
    let code: &[u8] = if code.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(code, code_size) }
    };
    let input: &[u8] = if msg.input_data.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(msg.input_data, msg.input_size) }
    };

    state.enter();
    state.executions.fetch_add(1, Ordering::SeqCst);
    state.last_revision.store(rev, Ordering::SeqCst);

    let mut gas_left = msg.gas;
    let mut output = input.to_vec();
    let mut status = ffi::QRVMC_SUCCESS;
    let zero = ffi::qrvmc_bytes32::default();

    for &op in code {
        gas_left -= 1;
        match op {
            0x01 => unsafe {
                if let (Some(get), Some(set)) = (host.get_storage, host.set_storage) {
                    let mut value = get(context, &msg.recipient, &zero);
                    value.bytes[31] = value.bytes[31].wrapping_add(1);
                    set(context, &msg.recipient, &zero, &value);
                }
            },
            0x02 => unsafe {
                if let Some(emit_log) = host.emit_log {
                    emit_log(context, &msg.recipient, input.as_ptr(), input.len(), ptr::null(), 0);
                }
            },
            0x03 => unsafe {
                if let Some(call) = host.call {
                    let mut inner = *msg;
                    inner.depth += 1;
                    let result = call(context, &inner);
                    output = if result.output_data.is_null() {
                        Vec::new()
                    } else {
                        std::slice::from_raw_parts(result.output_data, result.output_size).to_vec()
                    };
                    if let Some(release) = result.release {
                        release(&result);
                    }
                }
            },
            0x04 => thread::sleep(Duration::from_millis(20)),
            0x05 => unsafe {
                if let Some(account_exists) = host.account_exists {
                    account_exists(context, &msg.sender);
                }
            },
            0x06 => unsafe {
                if let Some(get_tx_context) = host.get_tx_context {
                    get_tx_context(context);
                }
            },
            0xfd => {
                status = ffi::QRVMC_REVERT;
                break;
            }
            _ => {}
        }
    }

    state.leave();
    native_result(status, gas_left, output)
}
