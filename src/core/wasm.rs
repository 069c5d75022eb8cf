//! Purpose: `Engine` implementation backed by a wasmtime instance of the engine module.
//! Exports: `WasmEngine`.
//! Role: Resolves `temporalz_*` exports by name and provides the `env.console` import.
//! Invariants: Exports are looked up per call, so a module missing an export still loads
//! and only the operations that need it fail (with `ErrorKind::Boundary`).
//! Invariants: Memory is accessed with copy-in/copy-out calls; no slice outlives a call.
//! Notes: Traps and signature mismatches are host-side failures, never classified as
//! engine domain errors.
use std::fs;

use tracing::{debug, info};
use wasmtime::{Caller, Instance, Linker, Memory, Module, Store, WasmParams, WasmResults};

use crate::core::codec::decode_text;
use crate::core::config::EngineConfig;
use crate::core::engine::{DurationField, Engine, PackedString, Ptr, RawHandle};
use crate::core::error::{Error, ErrorKind};

struct HostState {
    forward_console: bool,
    console: Vec<String>,
}

pub struct WasmEngine {
    store: Store<HostState>,
    instance: Instance,
    memory: Memory,
}

impl WasmEngine {
    pub fn load(config: &EngineConfig) -> Result<Self, Error> {
        let path = config.wasm_path();
        let bytes = fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read engine module {}", path.display()))
                .with_source(err)
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "loaded engine module");
        Self::from_bytes(&bytes, config.forward_console())
    }

    pub fn from_bytes(bytes: &[u8], forward_console: bool) -> Result<Self, Error> {
        let runtime = wasmtime::Engine::default();
        let module = Module::new(&runtime, bytes)
            .map_err(|err| Error::boundary(format!("failed to compile engine module: {err}")))?;

        let mut linker = Linker::new(&runtime);
        linker
            .func_wrap(
                "env",
                "console",
                |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                    let message = read_caller_text(&mut caller, ptr as u32, len as u32);
                    let state = caller.data_mut();
                    if state.forward_console {
                        info!(target: "temporalz::console", "{message}");
                    }
                    state.console.push(message);
                },
            )
            .map_err(|err| Error::boundary(format!("failed to define env.console: {err}")))?;

        let mut store = Store::new(
            &runtime,
            HostState {
                forward_console,
                console: Vec::new(),
            },
        );
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|err| Error::boundary(format!("failed to instantiate engine: {err}")))?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| Error::boundary("engine module does not export `memory`"))?;

        Ok(Self {
            store,
            instance,
            memory,
        })
    }

    /// Runs the engine's own `_start` entry point (self-test / demo output).
    pub fn run_start(&mut self) -> Result<(), Error> {
        self.call::<(), ()>("_start", ())
    }

    /// Every message the engine has written through `env.console`, oldest first.
    pub fn console_output(&self) -> &[String] {
        &self.store.data().console
    }

    fn call<P, R>(&mut self, name: &str, params: P) -> Result<R, Error>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self
            .instance
            .get_typed_func::<P, R>(&mut self.store, name)
            .map_err(|err| Error::boundary(format!("engine export `{name}` unavailable: {err}")))?;
        func.call(&mut self.store, params)
            .map_err(|err| Error::boundary(format!("engine call `{name}` failed: {err}")))
    }

    fn handle_call<P: WasmParams>(&mut self, name: &str, params: P) -> Result<RawHandle, Error> {
        self.call::<P, i32>(name, params).map(|raw| raw as RawHandle)
    }

    fn packed_call(&mut self, name: &str, handle: RawHandle) -> Result<PackedString, Error> {
        self.call::<(i32,), i64>(name, (handle as i32,))
            .map(|packed| packed as PackedString)
    }
}

fn read_caller_text(caller: &mut Caller<'_, HostState>, ptr: u32, len: u32) -> String {
    let Some(memory) = caller
        .get_export("memory")
        .and_then(|export| export.into_memory())
    else {
        return String::new();
    };
    let start = ptr as usize;
    let end = start.saturating_add(len as usize);
    memory
        .data(&*caller)
        .get(start..end)
        .map(|bytes| {
            decode_text(bytes).unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
        })
        .unwrap_or_default()
}

fn duration_field_export(field: DurationField) -> &'static str {
    match field {
        DurationField::Years => "temporalz_duration_years",
        DurationField::Months => "temporalz_duration_months",
        DurationField::Weeks => "temporalz_duration_weeks",
        DurationField::Days => "temporalz_duration_days",
        DurationField::Hours => "temporalz_duration_hours",
        DurationField::Minutes => "temporalz_duration_minutes",
        DurationField::Seconds => "temporalz_duration_seconds",
        DurationField::Milliseconds => "temporalz_duration_milliseconds",
        DurationField::Microseconds => "temporalz_duration_microseconds",
        DurationField::Nanoseconds => "temporalz_duration_nanoseconds",
    }
}

impl Engine for WasmEngine {
    fn read_memory(&mut self, ptr: Ptr, len: u32) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; len as usize];
        self.memory
            .read(&self.store, ptr as usize, &mut buf)
            .map_err(|err| {
                Error::boundary(format!("engine memory read out of bounds at {ptr}+{len}"))
                    .with_source(err)
            })?;
        Ok(buf)
    }

    fn write_memory(&mut self, ptr: Ptr, bytes: &[u8]) -> Result<(), Error> {
        self.memory
            .write(&mut self.store, ptr as usize, bytes)
            .map_err(|err| {
                Error::boundary(format!(
                    "engine memory write out of bounds at {ptr}+{}",
                    bytes.len()
                ))
                .with_source(err)
            })
    }

    fn alloc(&mut self, len: u32) -> Result<Ptr, Error> {
        self.call::<(i32,), i32>("temporalz_alloc", (len as i32,))
            .map(|ptr| ptr as Ptr)
    }

    fn free(&mut self, ptr: Ptr, len: u32) -> Result<(), Error> {
        self.call::<(i32, i32), ()>("temporalz_free", (ptr as i32, len as i32))
    }

    fn string_free(&mut self, ptr: Ptr, len: u32) -> Result<(), Error> {
        self.call::<(i32, i32), ()>("temporalz_string_free", (ptr as i32, len as i32))
    }

    fn last_error_ptr(&mut self) -> Result<Ptr, Error> {
        self.call::<(), i32>("temporalz_last_error_ptr", ())
            .map(|ptr| ptr as Ptr)
    }

    fn last_error_len(&mut self) -> Result<u32, Error> {
        self.call::<(), i32>("temporalz_last_error_len", ())
            .map(|len| len as u32)
    }

    fn last_error_clear(&mut self) -> Result<(), Error> {
        self.call::<(), ()>("temporalz_last_error_clear", ())
    }

    fn instant_from_epoch_milliseconds(&mut self, epoch_ms: f64) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_instant_from_epoch_milliseconds", (epoch_ms,))
    }

    fn instant_from_epoch_nanoseconds_parts(
        &mut self,
        hi: i64,
        lo: i64,
    ) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_instant_from_epoch_nanoseconds_parts", (hi, lo))
    }

    fn instant_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_instant_from_utf8", (ptr as i32, len as i32))
    }

    fn instant_epoch_milliseconds(&mut self, instant: RawHandle) -> Result<i64, Error> {
        self.call::<(i32,), i64>("temporalz_instant_epoch_milliseconds", (instant as i32,))
    }

    fn instant_epoch_nanoseconds_hi(&mut self, instant: RawHandle) -> Result<i64, Error> {
        self.call::<(i32,), i64>("temporalz_instant_epoch_nanoseconds_hi", (instant as i32,))
    }

    fn instant_epoch_nanoseconds_lo(&mut self, instant: RawHandle) -> Result<i64, Error> {
        self.call::<(i32,), i64>("temporalz_instant_epoch_nanoseconds_lo", (instant as i32,))
    }

    fn instant_to_string(&mut self, instant: RawHandle) -> Result<PackedString, Error> {
        self.packed_call("temporalz_instant_to_string", instant)
    }

    fn instant_add(
        &mut self,
        instant: RawHandle,
        duration: RawHandle,
    ) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_instant_add", (instant as i32, duration as i32))
    }

    fn instant_subtract(
        &mut self,
        instant: RawHandle,
        duration: RawHandle,
    ) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_instant_subtract", (instant as i32, duration as i32))
    }

    fn instant_round(
        &mut self,
        instant: RawHandle,
        smallest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
    ) -> Result<RawHandle, Error> {
        self.handle_call(
            "temporalz_instant_round",
            (
                instant as i32,
                smallest_unit as i32,
                rounding_mode as i32,
                rounding_increment as i32,
            ),
        )
    }

    fn instant_equals(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error> {
        self.call::<(i32, i32), i32>("temporalz_instant_equals", (left as i32, right as i32))
    }

    fn instant_compare(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error> {
        self.call::<(i32, i32), i32>("temporalz_instant_compare", (left as i32, right as i32))
    }

    fn plain_date_init(&mut self, year: i32, month: i32, day: i32) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_plain_date_init", (year, month, day))
    }

    fn plain_date_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_plain_date_from_utf8", (ptr as i32, len as i32))
    }

    fn plain_date_to_string(&mut self, date: RawHandle) -> Result<PackedString, Error> {
        self.packed_call("temporalz_plain_date_to_string", date)
    }

    fn duration_init(
        &mut self,
        whole: [i64; 8],
        microseconds: f64,
        nanoseconds: f64,
    ) -> Result<RawHandle, Error> {
        let [y, mo, w, d, h, mi, s, ms] = whole;
        self.handle_call(
            "temporalz_duration_init",
            (y, mo, w, d, h, mi, s, ms, microseconds, nanoseconds),
        )
    }

    fn duration_from_parts(
        &mut self,
        mask: u32,
        whole: [i64; 8],
        microseconds: f64,
        nanoseconds: f64,
    ) -> Result<RawHandle, Error> {
        let [y, mo, w, d, h, mi, s, ms] = whole;
        self.handle_call(
            "temporalz_duration_from_parts",
            (mask as i32, y, mo, w, d, h, mi, s, ms, microseconds, nanoseconds),
        )
    }

    fn duration_from_utf8(&mut self, ptr: Ptr, len: u32) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_duration_from_utf8", (ptr as i32, len as i32))
    }

    fn duration_compare(&mut self, left: RawHandle, right: RawHandle) -> Result<i32, Error> {
        self.call::<(i32, i32), i32>("temporalz_duration_compare", (left as i32, right as i32))
    }

    fn duration_compare_plain_date(
        &mut self,
        left: RawHandle,
        right: RawHandle,
        relative_to: RawHandle,
    ) -> Result<i32, Error> {
        self.call::<(i32, i32, i32), i32>(
            "temporalz_duration_compare_plain_date",
            (left as i32, right as i32, relative_to as i32),
        )
    }

    fn duration_add(&mut self, left: RawHandle, right: RawHandle) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_duration_add", (left as i32, right as i32))
    }

    fn duration_subtract(
        &mut self,
        left: RawHandle,
        right: RawHandle,
    ) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_duration_subtract", (left as i32, right as i32))
    }

    fn duration_abs(&mut self, duration: RawHandle) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_duration_abs", (duration as i32,))
    }

    fn duration_negated(&mut self, duration: RawHandle) -> Result<RawHandle, Error> {
        self.handle_call("temporalz_duration_negated", (duration as i32,))
    }

    fn duration_round(
        &mut self,
        duration: RawHandle,
        smallest_unit: u8,
        largest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
    ) -> Result<RawHandle, Error> {
        self.handle_call(
            "temporalz_duration_round",
            (
                duration as i32,
                smallest_unit as i32,
                largest_unit as i32,
                rounding_mode as i32,
                rounding_increment as i32,
            ),
        )
    }

    fn duration_round_plain_date(
        &mut self,
        duration: RawHandle,
        smallest_unit: u8,
        largest_unit: u8,
        rounding_mode: u8,
        rounding_increment: u32,
        relative_to: RawHandle,
    ) -> Result<RawHandle, Error> {
        self.handle_call(
            "temporalz_duration_round_plain_date",
            (
                duration as i32,
                smallest_unit as i32,
                largest_unit as i32,
                rounding_mode as i32,
                rounding_increment as i32,
                relative_to as i32,
            ),
        )
    }

    fn duration_total(&mut self, duration: RawHandle, unit: u8) -> Result<f64, Error> {
        self.call::<(i32, i32), f64>("temporalz_duration_total", (duration as i32, unit as i32))
    }

    fn duration_total_plain_date(
        &mut self,
        duration: RawHandle,
        unit: u8,
        relative_to: RawHandle,
    ) -> Result<f64, Error> {
        self.call::<(i32, i32, i32), f64>(
            "temporalz_duration_total_plain_date",
            (duration as i32, unit as i32, relative_to as i32),
        )
    }

    fn duration_sign(&mut self, duration: RawHandle) -> Result<i32, Error> {
        self.call::<(i32,), i32>("temporalz_duration_sign", (duration as i32,))
    }

    fn duration_blank(&mut self, duration: RawHandle) -> Result<i32, Error> {
        self.call::<(i32,), i32>("temporalz_duration_blank", (duration as i32,))
    }

    fn duration_to_string(&mut self, duration: RawHandle) -> Result<PackedString, Error> {
        self.packed_call("temporalz_duration_to_string", duration)
    }

    fn duration_whole_field(
        &mut self,
        duration: RawHandle,
        field: DurationField,
    ) -> Result<i64, Error> {
        self.call::<(i32,), i64>(duration_field_export(field), (duration as i32,))
    }

    fn duration_fraction_field(
        &mut self,
        duration: RawHandle,
        field: DurationField,
    ) -> Result<f64, Error> {
        self.call::<(i32,), f64>(duration_field_export(field), (duration as i32,))
    }
}
