/// Default number of wait slot cells: one 64 KiB page of `i32`s, cursor included.
pub const DEFAULT_WAIT_SLOTS: u32 = 16_384;
/// Smallest usable array: the cursor plus one slot.
pub const MIN_WAIT_SLOTS: u32 = 2;
/// Largest array: four pages of `i32`s. Each cell also costs a host-side ticket.
pub const MAX_WAIT_SLOTS: u32 = 65_536;
/// Default time a `thread-spawn` call waits for the new thread, in milliseconds.
pub const DEFAULT_SPAWN_TIMEOUT_MS: u64 = 1_000;
/// Export called on spawned threads with `(thread_id, start_arg)`.
pub const DEFAULT_THREAD_ENTRY: &str = "wasi_thread_start";
/// Default shared linear memory size in 64 KiB pages.
pub const DEFAULT_MEMORY_INITIAL_PAGES: u32 = 512;
/// Default shared linear memory limit in 64 KiB pages.
pub const DEFAULT_MEMORY_MAXIMUM_PAGES: u32 = 4_096;
/// Hard limit for 32-bit linear memories.
pub const MAX_MEMORY_PAGES: u32 = 65_536;
/// Prefix of generated namespace identifiers.
pub const NAMESPACE_PREFIX: &str = "wasm_";
