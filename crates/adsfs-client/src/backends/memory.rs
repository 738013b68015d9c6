//! In-memory ADS file service.
//!
//! Emulates the system-service file groups of a target: one directory tree
//! per logical root, file and find handle tables, and a call log. Faults can
//! be injected to exercise error paths. All data is ephemeral.
//!
//! Paths accept either separator and are case-sensitive. Every root has an
//! implicit, undeletable top directory (the empty path).

use std::collections::{BTreeMap, HashMap, HashSet};

use adsfs_types::path::{decode_latin1, split_nul_terminated};
use adsfs_types::record::{RawRecord, encode_record};
use adsfs_types::{AdsErrorCode, FileAttributes, IndexGroup, LogicalRoot, OpenMode, RECORD_LEN};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::transport::{AdsTransport, SubstrateError};

/// 2024-01-01T00:00:00Z as FILETIME.
const EPOCH_TICKS: i64 = 133_485_408_000_000_000;

/// One second in FILETIME ticks.
const TICK: i64 = 10_000_000;

type Reply<T> = Result<T, SubstrateError>;

fn fail(code: AdsErrorCode) -> SubstrateError {
    SubstrateError::new(code)
}

/// Which substrate primitive a call used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Read,
    Write,
    ReadWrite,
}

/// One logged round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    pub group: u32,
    pub offset: u32,
    /// Size of the reply buffer offered by the caller.
    pub read_len: usize,
    /// Bytes sent by the caller.
    pub data: Vec<u8>,
}

/// Misbehavior to emulate. Active until [`MemoryTarget::clear_faults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// File opens reply with handle 0.
    ZeroFileHandle,
    /// Find records carry handle 0.
    ZeroFindHandle,
    /// Find replies are cut short of the record length.
    ShortFindRecord,
    /// Writes acknowledge one byte less than sent.
    ShortAck,
    /// Writes reply with no acknowledgement at all.
    EmptyAck,
}

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, modified: i64 },
    Directory { modified: i64 },
}

impl Node {
    fn modified(&self) -> i64 {
        match self {
            Node::File { modified, .. } | Node::Directory { modified } => *modified,
        }
    }
}

#[derive(Debug)]
struct OpenFile {
    root: LogicalRoot,
    key: String,
    mode: OpenMode,
    position: usize,
}

#[derive(Debug)]
struct FindScan {
    records: Vec<RawRecord>,
    next: usize,
}

#[derive(Debug)]
struct PendingFailure {
    group: u32,
    /// Calls to `group` still to let through before failing.
    skip: usize,
    code: AdsErrorCode,
}

type Tree = BTreeMap<String, Node>;

#[derive(Debug, Default)]
struct State {
    roots: HashMap<LogicalRoot, Tree>,
    files: HashMap<u32, OpenFile>,
    finds: HashMap<u16, FindScan>,
    next_file: u32,
    next_find: u16,
    clock: i64,
    calls: Vec<Call>,
    faults: HashSet<Fault>,
    failures: Vec<PendingFailure>,
}

/// In-memory target implementing [`AdsTransport`].
///
/// Thread-safe via an internal mutex; the lock is never held across an
/// await point.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    state: Mutex<State>,
}

impl MemoryTarget {
    /// Create a target with empty roots.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Seeding and inspection
    // ========================================================================

    /// Store a file, creating missing parent directories.
    pub fn put_file(&self, root: LogicalRoot, path: &str, data: impl AsRef<[u8]>) {
        let mut state = self.state.lock();
        let now = state.tick();
        let key = normalize(path);
        let tree = state.roots.entry(root).or_default();
        create_parents(tree, &key, now);
        tree.insert(
            key,
            Node::File {
                data: data.as_ref().to_vec(),
                modified: now,
            },
        );
    }

    /// Create a directory and its missing parents.
    pub fn put_dir(&self, root: LogicalRoot, path: &str) {
        let mut state = self.state.lock();
        let now = state.tick();
        let key = normalize(path);
        let tree = state.roots.entry(root).or_default();
        create_parents(tree, &key, now);
        if !key.is_empty() {
            tree.entry(key).or_insert(Node::Directory { modified: now });
        }
    }

    /// Contents of a file, if `path` is one.
    pub fn file_contents(&self, root: LogicalRoot, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        match state.roots.get(&root)?.get(&normalize(path))? {
            Node::File { data, .. } => Some(data.clone()),
            Node::Directory { .. } => None,
        }
    }

    /// Whether a file or directory exists at `path`.
    pub fn contains(&self, root: LogicalRoot, path: &str) -> bool {
        let key = normalize(path);
        key.is_empty()
            || self
                .state
                .lock()
                .roots
                .get(&root)
                .is_some_and(|tree| tree.contains_key(&key))
    }

    /// Whether `path` is a directory.
    pub fn is_dir(&self, root: LogicalRoot, path: &str) -> bool {
        let state = self.state.lock();
        state
            .roots
            .get(&root)
            .is_some_and(|tree| is_dir(tree, &normalize(path)))
    }

    /// Every path stored under `root`, sorted.
    pub fn paths(&self, root: LogicalRoot) -> Vec<String> {
        let state = self.state.lock();
        state
            .roots
            .get(&root)
            .map(|tree| tree.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// File handles not yet closed.
    pub fn open_file_handles(&self) -> usize {
        self.state.lock().files.len()
    }

    /// Find handles not yet closed.
    pub fn open_find_handles(&self) -> usize {
        self.state.lock().finds.len()
    }

    /// Every round trip so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Most recent round trip.
    pub fn last_call(&self) -> Option<Call> {
        self.state.lock().calls.last().cloned()
    }

    /// Number of round trips addressed to `group`.
    pub fn calls_for(&self, group: IndexGroup) -> usize {
        let value = group.value();
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.group == value)
            .count()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    /// Activate a fault.
    pub fn inject(&self, fault: Fault) {
        self.state.lock().faults.insert(fault);
    }

    /// Deactivate every fault and pending failure.
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.faults.clear();
        state.failures.clear();
    }

    /// Fail the next call to `group` with `code`.
    pub fn fail_next(&self, group: IndexGroup, code: AdsErrorCode) {
        self.fail_nth(group, 1, code);
    }

    /// Fail the `n`th upcoming call to `group` (1-based) with `code`.
    pub fn fail_nth(&self, group: IndexGroup, n: usize, code: AdsErrorCode) {
        self.state.lock().failures.push(PendingFailure {
            group: group.value(),
            skip: n.saturating_sub(1),
            code,
        });
    }
}

#[async_trait]
impl AdsTransport for MemoryTarget {
    async fn read(&self, group: u32, offset: u32, dest: &mut [u8]) -> Result<usize, SubstrateError> {
        let mut state = self.state.lock();
        state.log(CallKind::Read, group, offset, dest.len(), &[]);
        state.take_failure(group)?;
        match IndexGroup::from_value(group) {
            Some(IndexGroup::FileRead) => state.read_file(offset, dest),
            Some(_) => Err(fail(AdsErrorCode::SERVICE_NOT_SUPPORTED)),
            None => Err(fail(AdsErrorCode::INVALID_GROUP)),
        }
    }

    async fn write(&self, group: u32, offset: u32, src: &[u8]) -> Result<(), SubstrateError> {
        let mut state = self.state.lock();
        state.log(CallKind::Write, group, offset, 0, src);
        state.take_failure(group)?;
        match IndexGroup::from_value(group) {
            Some(IndexGroup::MakeDirectory) => state.make_directory(offset, src),
            Some(IndexGroup::CloseHandle) => state.close_find(offset, src),
            Some(_) => Err(fail(AdsErrorCode::SERVICE_NOT_SUPPORTED)),
            None => Err(fail(AdsErrorCode::INVALID_GROUP)),
        }
    }

    async fn read_write(
        &self,
        group: u32,
        offset: u32,
        dest: &mut [u8],
        src: &[u8],
    ) -> Result<usize, SubstrateError> {
        let mut state = self.state.lock();
        state.log(CallKind::ReadWrite, group, offset, dest.len(), src);
        state.take_failure(group)?;
        match IndexGroup::from_value(group) {
            Some(IndexGroup::FileOpen) => state.open_file(offset, dest, src),
            Some(IndexGroup::FileRead) => state.read_file(offset, dest),
            Some(IndexGroup::FileWrite) => state.write_file(offset, dest, src),
            Some(IndexGroup::FileClose) => state.close_file(offset),
            Some(IndexGroup::FileDelete) => state.delete_file(offset, src),
            Some(IndexGroup::FileRename) => state.rename(offset, src),
            Some(IndexGroup::FileFind) => state.find(offset, dest, src),
            Some(IndexGroup::RemoveDirectory) => state.remove_directory(offset, src),
            Some(_) => Err(fail(AdsErrorCode::SERVICE_NOT_SUPPORTED)),
            None => Err(fail(AdsErrorCode::INVALID_GROUP)),
        }
    }
}

impl State {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        EPOCH_TICKS + self.clock * TICK
    }

    fn log(&mut self, kind: CallKind, group: u32, offset: u32, read_len: usize, data: &[u8]) {
        self.calls.push(Call {
            kind,
            group,
            offset,
            read_len,
            data: data.to_vec(),
        });
    }

    fn take_failure(&mut self, group: u32) -> Reply<()> {
        let Some(index) = self.failures.iter().position(|f| f.group == group) else {
            return Ok(());
        };
        let pending = &mut self.failures[index];
        if pending.skip > 0 {
            pending.skip -= 1;
            return Ok(());
        }
        let code = self.failures.remove(index).code;
        Err(fail(code))
    }

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn tree_mut(&mut self, root: LogicalRoot) -> &mut Tree {
        self.roots.entry(root).or_default()
    }

    fn alloc_file(&mut self) -> u32 {
        loop {
            self.next_file = self.next_file.wrapping_add(1).max(1);
            if !self.files.contains_key(&self.next_file) {
                return self.next_file;
            }
        }
    }

    fn alloc_find(&mut self) -> u16 {
        loop {
            self.next_find = self.next_find.wrapping_add(1).max(1);
            if !self.finds.contains_key(&self.next_find) {
                return self.next_find;
            }
        }
    }

    // ------------------------------------------------------------------------
    // File handles
    // ------------------------------------------------------------------------

    fn open_file(&mut self, offset: u32, dest: &mut [u8], src: &[u8]) -> Reply<usize> {
        if dest.len() < 4 {
            return Err(fail(AdsErrorCode::INVALID_SIZE));
        }
        let root = root_from_selector(offset >> 16)?;
        let mode = OpenMode::from_bits_retain(offset & 0xFFFF);
        let key = normalize(&decode_latin1(src));
        if key.is_empty() {
            return Err(fail(AdsErrorCode::INVALID_ACCESS));
        }
        let writing = mode.intersects(OpenMode::WRITE | OpenMode::APPEND);
        let now = self.tick();
        let tree = self.tree_mut(root);

        match kind_of(tree, &key) {
            Some(Kind::Directory) => return Err(fail(AdsErrorCode::INVALID_ACCESS)),
            Some(Kind::File) => {}
            None if !writing => return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND)),
            None => {
                if mode.contains(OpenMode::ENSURE_DIRECTORY) {
                    create_parents(tree, &key, now);
                } else if !is_dir(tree, parent(&key)) {
                    return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
                }
                tree.insert(
                    key.clone(),
                    Node::File {
                        data: Vec::new(),
                        modified: now,
                    },
                );
            }
        }

        let mut position = 0;
        if let Some(Node::File { data, modified }) = tree.get_mut(&key) {
            if mode.contains(OpenMode::WRITE) {
                data.clear();
                *modified = now;
            }
            if mode.contains(OpenMode::APPEND) {
                position = data.len();
            }
        }

        if self.has(Fault::ZeroFileHandle) {
            dest[..4].copy_from_slice(&0u32.to_le_bytes());
            return Ok(4);
        }
        let handle = self.alloc_file();
        self.files.insert(
            handle,
            OpenFile {
                root,
                key,
                mode,
                position,
            },
        );
        dest[..4].copy_from_slice(&handle.to_le_bytes());
        Ok(4)
    }

    fn read_file(&mut self, handle: u32, dest: &mut [u8]) -> Reply<usize> {
        let open = self
            .files
            .get_mut(&handle)
            .ok_or_else(|| fail(AdsErrorCode::HANDLE_INVALID))?;
        if !open.mode.intersects(OpenMode::READ | OpenMode::PLUS) {
            return Err(fail(AdsErrorCode::INVALID_ACCESS));
        }
        let Some(Node::File { data, .. }) = self.roots.get(&open.root).and_then(|t| t.get(&open.key))
        else {
            return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
        };
        let start = open.position.min(data.len());
        let n = (data.len() - start).min(dest.len());
        dest[..n].copy_from_slice(&data[start..start + n]);
        open.position = start + n;
        Ok(n)
    }

    fn write_file(&mut self, handle: u32, dest: &mut [u8], src: &[u8]) -> Reply<usize> {
        let short_ack = self.has(Fault::ShortAck);
        let empty_ack = self.has(Fault::EmptyAck);
        let now = self.tick();
        let open = self
            .files
            .get_mut(&handle)
            .ok_or_else(|| fail(AdsErrorCode::HANDLE_INVALID))?;
        if !open
            .mode
            .intersects(OpenMode::WRITE | OpenMode::APPEND | OpenMode::PLUS)
        {
            return Err(fail(AdsErrorCode::INVALID_ACCESS));
        }
        let Some(Node::File { data, modified }) = self
            .roots
            .get_mut(&open.root)
            .and_then(|t| t.get_mut(&open.key))
        else {
            return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
        };
        let end = open.position + src.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[open.position..end].copy_from_slice(src);
        open.position = end;
        *modified = now;

        if empty_ack || dest.len() < 4 {
            return Ok(0);
        }
        let acknowledged = if short_ack {
            src.len().saturating_sub(1)
        } else {
            src.len()
        };
        dest[..4].copy_from_slice(&(acknowledged as u32).to_le_bytes());
        Ok(4)
    }

    fn close_file(&mut self, handle: u32) -> Reply<usize> {
        self.files
            .remove(&handle)
            .map(|_| 0)
            .ok_or_else(|| fail(AdsErrorCode::HANDLE_INVALID))
    }

    // ------------------------------------------------------------------------
    // Path operations
    // ------------------------------------------------------------------------

    fn delete_file(&mut self, offset: u32, src: &[u8]) -> Reply<usize> {
        let root = root_from_selector(offset)?;
        let key = normalize(&decode_latin1(src));
        let tree = self.tree_mut(root);
        match kind_of(tree, &key) {
            Some(Kind::File) => {
                tree.remove(&key);
                Ok(0)
            }
            Some(Kind::Directory) => Err(fail(AdsErrorCode::INVALID_ACCESS)),
            None => Err(fail(AdsErrorCode::DEVICE_NOT_FOUND)),
        }
    }

    fn make_directory(&mut self, offset: u32, src: &[u8]) -> Reply<()> {
        let root = root_from_selector(offset)?;
        let key = normalize(&decode_latin1(src));
        let now = self.tick();
        let tree = self.tree_mut(root);
        if key.is_empty() || tree.contains_key(&key) {
            return Err(fail(AdsErrorCode::DEVICE_EXISTS));
        }
        if !is_dir(tree, parent(&key)) {
            return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
        }
        tree.insert(key, Node::Directory { modified: now });
        Ok(())
    }

    fn remove_directory(&mut self, offset: u32, src: &[u8]) -> Reply<usize> {
        let root = root_from_selector(offset)?;
        let key = normalize(&decode_latin1(src));
        if key.is_empty() {
            return Err(fail(AdsErrorCode::INVALID_ACCESS));
        }
        let tree = self.tree_mut(root);
        match kind_of(tree, &key) {
            Some(Kind::Directory) => {}
            Some(Kind::File) => return Err(fail(AdsErrorCode::INVALID_ACCESS)),
            None => return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND)),
        }
        if children(tree, &key).next().is_some() {
            return Err(fail(AdsErrorCode::INVALID_STATE));
        }
        tree.remove(&key);
        Ok(0)
    }

    fn rename(&mut self, offset: u32, src: &[u8]) -> Reply<usize> {
        let root = root_from_selector(offset >> 16)?;
        let overwrite = offset & 0xFFFF == OpenMode::OVERWRITE.bits();
        let parts = split_nul_terminated(src);
        let [from, to] = parts.as_slice() else {
            return Err(fail(AdsErrorCode::INVALID_DATA));
        };
        let (from, to) = (normalize(from), normalize(to));
        let now = self.tick();
        let tree = self.tree_mut(root);

        let Some(node) = tree.get(&from).cloned() else {
            return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
        };
        if from.is_empty() || to.is_empty() || is_within(&to, &from) {
            return Err(fail(AdsErrorCode::INVALID_ACCESS));
        }
        if !is_dir(tree, parent(&to)) {
            return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
        }
        match kind_of(tree, &to) {
            None => {}
            Some(_) if !overwrite => return Err(fail(AdsErrorCode::DEVICE_EXISTS)),
            Some(Kind::Directory) => return Err(fail(AdsErrorCode::INVALID_ACCESS)),
            Some(Kind::File) => {
                if matches!(node, Node::Directory { .. }) {
                    return Err(fail(AdsErrorCode::INVALID_ACCESS));
                }
            }
        }

        let moved: Vec<String> = tree
            .keys()
            .filter(|key| *key == &from || is_within(key, &from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(mut node) = tree.remove(&key) {
                if key == from {
                    if let Node::File { modified, .. } | Node::Directory { modified } = &mut node {
                        *modified = now;
                    }
                }
                let new_key = format!("{to}{}", &key[from.len()..]);
                tree.insert(new_key, node);
            }
        }
        Ok(0)
    }

    // ------------------------------------------------------------------------
    // Find
    // ------------------------------------------------------------------------

    fn find(&mut self, offset: u32, dest: &mut [u8], src: &[u8]) -> Reply<usize> {
        if src.is_empty() {
            let handle = u16::try_from(offset).map_err(|_| fail(AdsErrorCode::INVALID_OFFSET))?;
            let scan = self
                .finds
                .get_mut(&handle)
                .ok_or_else(|| fail(AdsErrorCode::HANDLE_INVALID))?;
            let Some(record) = scan.records.get(scan.next).cloned() else {
                return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
            };
            scan.next += 1;
            return self.emit(record, handle, dest);
        }

        let root = root_from_selector(offset)?;
        let search = decode_latin1(src);
        let (dir, pattern) = split_search(&search);
        let key = normalize(dir);
        let tree = self.tree_mut(root);
        if !is_dir(tree, &key) {
            return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
        }

        let dir_modified = tree.get(&key).map_or(EPOCH_TICKS, Node::modified);
        let mut records: Vec<RawRecord> = [".", ".."]
            .into_iter()
            .filter(|dot| wildcard_match(pattern, dot))
            .map(|dot| directory_record(dot, dir_modified))
            .collect();
        records.extend(
            children(tree, &key)
                .filter(|(name, _)| wildcard_match(pattern, name))
                .map(|(name, node)| match node {
                    Node::File { data, modified } => file_record(name, data.len(), *modified),
                    Node::Directory { modified } => directory_record(name, *modified),
                }),
        );
        if records.is_empty() {
            return Err(fail(AdsErrorCode::DEVICE_NOT_FOUND));
        }

        let handle = self.alloc_find();
        let first = records[0].clone();
        self.finds.insert(handle, FindScan { records, next: 1 });
        self.emit(first, handle, dest)
    }

    fn emit(&self, mut record: RawRecord, handle: u16, dest: &mut [u8]) -> Reply<usize> {
        record.handle = if self.has(Fault::ZeroFindHandle) {
            0
        } else {
            handle
        };
        let bytes = encode_record(&record).map_err(|_| fail(AdsErrorCode::INVALID_DATA))?;
        let available = if self.has(Fault::ShortFindRecord) {
            RECORD_LEN / 2
        } else {
            bytes.len()
        };
        let n = available.min(dest.len());
        dest[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn close_find(&mut self, offset: u32, src: &[u8]) -> Reply<()> {
        if offset != 0 {
            return Err(fail(AdsErrorCode::INVALID_OFFSET));
        }
        let bytes: [u8; 4] = src
            .try_into()
            .map_err(|_| fail(AdsErrorCode::INVALID_SIZE))?;
        let handle = u16::try_from(u32::from_le_bytes(bytes))
            .map_err(|_| fail(AdsErrorCode::HANDLE_INVALID))?;
        self.finds
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| fail(AdsErrorCode::HANDLE_INVALID))
    }
}

// ============================================================================
// Tree helpers
// ============================================================================

/// Normalize a path: either separator, no empty or `.` components, `..`
/// pops.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn parent(key: &str) -> &str {
    key.rfind('/').map_or("", |index| &key[..index])
}

fn name_of(key: &str) -> &str {
    key.rfind('/').map_or(key, |index| &key[index + 1..])
}

/// Whether `key` lies strictly below `dir`.
fn is_within(key: &str, dir: &str) -> bool {
    key.len() > dir.len() && key.starts_with(dir) && key.as_bytes()[dir.len()] == b'/'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Directory,
}

fn kind_of(tree: &Tree, key: &str) -> Option<Kind> {
    tree.get(key).map(|node| match node {
        Node::File { .. } => Kind::File,
        Node::Directory { .. } => Kind::Directory,
    })
}

fn is_dir(tree: &Tree, key: &str) -> bool {
    key.is_empty() || matches!(tree.get(key), Some(Node::Directory { .. }))
}

fn create_parents(tree: &mut Tree, key: &str, now: i64) {
    let mut current = parent(key);
    let mut missing = Vec::new();
    while !current.is_empty() && !tree.contains_key(current) {
        missing.push(current.to_string());
        current = parent(current);
    }
    for dir in missing {
        tree.insert(dir, Node::Directory { modified: now });
    }
}

/// Direct children of `dir`, sorted by name.
fn children<'a>(tree: &'a Tree, dir: &'a str) -> impl Iterator<Item = (&'a str, &'a Node)> + 'a {
    tree.iter()
        .filter(move |(key, _)| !key.is_empty() && parent(key) == dir)
        .map(|(key, node)| (name_of(key), node))
}

fn root_from_selector(selector: u32) -> Reply<LogicalRoot> {
    u16::try_from(selector)
        .ok()
        .and_then(LogicalRoot::from_selector)
        .ok_or_else(|| fail(AdsErrorCode::INVALID_OFFSET))
}

/// Split `dir/pattern` at the last separator.
fn split_search(search: &str) -> (&str, &str) {
    match search.rfind(['/', '\\']) {
        Some(index) => (&search[..index], &search[index + 1..]),
        None => ("", search),
    }
}

/// Case-insensitive `*`/`?` match. `*.*` matches every name, as on the
/// target.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    if pattern == "*.*" || pattern == "*" {
        return true;
    }
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let name: Vec<char> = name.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, n));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

fn directory_record(name: &str, modified: i64) -> RawRecord {
    RawRecord {
        attributes: FileAttributes::DIRECTORY.bits(),
        creation_time: modified,
        last_access_time: modified,
        last_write_time: modified,
        name: name.to_string(),
        ..RawRecord::default()
    }
}

fn file_record(name: &str, size: usize, modified: i64) -> RawRecord {
    RawRecord {
        attributes: FileAttributes::ARCHIVE.bits(),
        creation_time: modified,
        last_access_time: modified,
        last_write_time: modified,
        size: size as u64,
        name: name.to_string(),
        ..RawRecord::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adsfs_types::record::decode_raw;
    use adsfs_types::{FIND_RESPONSE_LEN, index_offset};

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a//b/./c/"), "a/b/c");
        assert_eq!(normalize("a\\b\\..\\c"), "a/c");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*.*", "noext"));
        assert!(wildcard_match("*.txt", "A.TXT"));
        assert!(!wildcard_match("*.txt", "a.bin"));
        assert!(wildcard_match("Port_?51.*", "Port_851.app"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b", "ac"));
    }

    #[tokio::test]
    async fn test_find_sequence_and_close() {
        let target = MemoryTarget::new();
        target.put_file(LogicalRoot::Generic, "d/one.txt", b"1");
        let group = IndexGroup::FileFind.value();
        let mut buf = vec![0u8; FIND_RESPONSE_LEN];

        let n = target.read_write(group, 1, &mut buf, b"d/*.*\0").await.unwrap();
        assert_eq!(n, FIND_RESPONSE_LEN);
        let first = decode_raw(&buf).unwrap();
        assert_eq!(first.name, ".");

        let handle = u32::from(first.handle);
        target.read_write(group, handle, &mut buf, &[]).await.unwrap();
        assert_eq!(decode_raw(&buf).unwrap().name, "..");
        target.read_write(group, handle, &mut buf, &[]).await.unwrap();
        let file = decode_raw(&buf).unwrap();
        assert_eq!((file.name.as_str(), file.size), ("one.txt", 1));

        let end = target.read_write(group, handle, &mut buf, &[]).await.unwrap_err();
        assert_eq!(end.code, AdsErrorCode::DEVICE_NOT_FOUND);
        assert_eq!(target.open_find_handles(), 1);

        target
            .write(IndexGroup::CloseHandle.value(), 0, &handle.to_le_bytes())
            .await
            .unwrap();
        assert_eq!(target.open_find_handles(), 0);
    }

    #[tokio::test]
    async fn test_open_write_requires_parent() {
        let target = MemoryTarget::new();
        let mut reply = [0u8; 4];
        let group = IndexGroup::FileOpen.value();
        let err = target
            .read_write(group, index_offset(OpenMode::write_binary(), LogicalRoot::Generic), &mut reply, b"x/y\0")
            .await
            .unwrap_err();
        assert_eq!(err.code, AdsErrorCode::DEVICE_NOT_FOUND);

        let mode = OpenMode::write_binary() | OpenMode::ENSURE_DIRECTORY;
        target
            .read_write(group, index_offset(mode, LogicalRoot::Generic), &mut reply, b"x/y\0")
            .await
            .unwrap();
        assert!(target.is_dir(LogicalRoot::Generic, "x"));
        assert_eq!(target.open_file_handles(), 1);
    }

    #[tokio::test]
    async fn test_wrong_primitive_is_rejected() {
        let target = MemoryTarget::new();
        let err = target
            .write(IndexGroup::FileDelete.value(), 1, b"a\0")
            .await
            .unwrap_err();
        assert_eq!(err.code, AdsErrorCode::SERVICE_NOT_SUPPORTED);
    }

    #[tokio::test]
    async fn test_fail_nth_counts_calls() {
        let target = MemoryTarget::new();
        target.put_dir(LogicalRoot::Generic, "a");
        target.fail_nth(IndexGroup::MakeDirectory, 2, AdsErrorCode::BUSY);
        let group = IndexGroup::MakeDirectory.value();
        target.write(group, 1, b"b\0").await.unwrap();
        let err = target.write(group, 1, b"c\0").await.unwrap_err();
        assert_eq!(err.code, AdsErrorCode::BUSY);
        target.write(group, 1, b"c\0").await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_moves_subtree() {
        let target = MemoryTarget::new();
        target.put_file(LogicalRoot::Generic, "old/x/y.txt", b"y");
        let group = IndexGroup::FileRename.value();
        let offset = adsfs_types::rename_offset(false, LogicalRoot::Generic);
        target.read_write(group, offset, &mut [], b"old\0new\0").await.unwrap();
        assert_eq!(target.paths(LogicalRoot::Generic), vec!["new", "new/x", "new/x/y.txt"]);
    }
}
