//! Call-stack capture and rendering.
//!
//! A `Stack` holds up to `MAX_FRAMES` raw return addresses taken at error
//! construction. Nothing is resolved until someone asks for `frames()` or
//! `lines()`, so building an error costs one stack walk and no symbol lookup.
//!
//! ```text
//!  innermost                                              outermost
//!  [walker internals] walk capture_with capture with_skip new │ user ... main
//!                     ▲──────────── skipped ─────────────────┘ ▲
//!                   anchor                             first kept frame
//! ```
//!
//! The walk locates its own frame (`walk`) by symbol address and counts the
//! requested skip from there, so frames belonging to the walker itself never
//! leak into the result whatever the platform unwinder adds below it.

use std::fmt;
use std::hint::black_box;

use crate::config::{self, StackConfig, MAX_FRAMES};

/// Frames recorded while looking for the anchor. The anchor normally sits
/// within the first handful of frames.
const WINDOW: usize = 64;

/// Raw return addresses captured at construction.
///
/// Fixed capacity, `Copy`, no heap. Two stacks are equal if they hold the
/// same addresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stack {
    ips: [usize; MAX_FRAMES],
    len: u8,
}

impl Stack {
    /// A stack with no frames.
    pub const EMPTY: Stack = Stack {
        ips: [0; MAX_FRAMES],
        len: 0,
    };

    /// Capture the caller's stack with the process-wide settings.
    ///
    /// `skip` is the number of frames between the capture and the frame that
    /// should come first. `Stack::capture(0)` makes the direct caller the
    /// first entry.
    #[inline(never)]
    pub fn capture(skip: usize) -> Stack {
        black_box(Self::capture_with(&config::global(), skip + 1))
    }

    /// Capture with explicit settings. See [`Stack::capture`] for `skip`.
    #[inline(never)]
    pub fn capture_with(config: &StackConfig, skip: usize) -> Stack {
        let depth = config.effective_depth();
        if depth == 0 {
            return Stack::EMPTY;
        }
        black_box(walk(depth, skip + 1))
    }

    /// Build from raw addresses; anything past `MAX_FRAMES` is dropped.
    pub fn from_ips(ips: &[usize]) -> Stack {
        let mut stack = Stack::EMPTY;
        for &ip in ips.iter().take(MAX_FRAMES) {
            stack.ips[stack.len as usize] = ip;
            stack.len += 1;
        }
        stack
    }

    /// The raw addresses, innermost first.
    #[inline]
    pub fn ips(&self) -> &[usize] {
        &self.ips[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolve every captured address, innermost first.
    pub fn frames(&self) -> Vec<Frame> {
        self.ips().iter().map(|&ip| Frame::resolve(ip)).collect()
    }

    /// One `<file>:<line>\t<short-name>` line per frame.
    pub fn lines(&self) -> Vec<String> {
        self.ips().iter().map(|&ip| Frame::resolve(ip).to_string()).collect()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Stack::EMPTY
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.lines()).finish()
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines().iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

// ── Walking ───────────────────────────────────────────────────────

cfg_if::cfg_if! {
    if #[cfg(any(unix, windows))] {
        /// Walk the current stack, find this function's frame, then keep
        /// `depth` frames after skipping `skip` more.
        ///
        /// The walk runs until the anchor is seen and enough frames follow it,
        /// or `WINDOW` frames have been recorded. If the anchor never shows up
        /// (no symbol-address support), the skip counts from the innermost
        /// walked frame instead. A null return address ends the walk.
        #[inline(never)]
        fn walk(depth: usize, skip: usize) -> Stack {
            let anchor = walk as *const () as usize;
            let mut window = [0usize; WINDOW];
            let mut seen = 0usize;
            let mut found: Option<usize> = None;

            backtrace::trace(|frame| {
                let ip = frame.ip() as usize;
                if ip == 0 {
                    return false;
                }
                if found.is_none() && frame.symbol_address() as usize == anchor {
                    found = Some(seen);
                }
                window[seen] = ip;
                seen += 1;
                match found {
                    None => seen < WINDOW,
                    Some(at) => seen < WINDOW && seen < at + 1 + skip + depth,
                }
            });

            let start = found.map_or(skip, |at| at + 1 + skip);
            if start >= seen {
                return Stack::EMPTY;
            }
            let end = (start + depth).min(seen);
            Stack::from_ips(&window[start..end])
        }
    } else {
        #[inline(never)]
        fn walk(_depth: usize, _skip: usize) -> Stack {
            Stack::EMPTY
        }
    }
}

// ── Frames ────────────────────────────────────────────────────────

/// A resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub ip: usize,
    /// Source path, `?` when unknown.
    pub file: String,
    /// Line number, `0` when unknown.
    pub line: u32,
    /// Demangled symbol without the hash suffix. Empty when unresolved.
    pub function: String,
}

impl Frame {
    /// Resolve one raw address. Inlined frames report the innermost symbol.
    pub fn resolve(ip: usize) -> Frame {
        let mut resolved: Option<Frame> = None;
        backtrace::resolve(ip as *mut std::ffi::c_void, |symbol| {
            if resolved.is_some() {
                return;
            }
            resolved = Some(Frame {
                ip,
                file: symbol
                    .filename()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "?".to_string()),
                line: symbol.lineno().unwrap_or(0),
                function: symbol
                    .name()
                    .map(|name| format!("{:#}", name))
                    .unwrap_or_default(),
            });
        });
        resolved.unwrap_or_else(|| Frame::unresolved(ip))
    }

    fn unresolved(ip: usize) -> Frame {
        Frame {
            ip,
            file: "?".to_string(),
            line: 0,
            function: String::new(),
        }
    }

    /// Function name with module path and first qualifier stripped.
    pub fn short_name(&self) -> String {
        if self.function.is_empty() {
            return format!("{:#x}", self.ip);
        }
        short_name(&qualify(&self.function)).to_string()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}\t{}", self.file, self.line, self.short_name())
    }
}

// ── Names ─────────────────────────────────────────────────────────

/// Two-step truncation of a qualified name: drop everything through the last
/// `/`, then everything through the first remaining `.`.
///
/// `pkg/path.Type.Method` → `path.Type.Method` → `Type.Method`
pub fn short_name(qualified: &str) -> &str {
    let name = match qualified.rfind('/') {
        Some(n) => &qualified[n + 1..],
        None => qualified,
    };
    match name.find('.') {
        Some(n) => &name[n + 1..],
        None => name,
    }
}

/// Reshape a demangled Rust path into `module/path.Type.method` form.
///
/// Leading lowercase segments (other than the function itself) form the
/// module path and are joined with `/`; the rest is joined with `.`.
/// `<T as Trait>` segments expand to `T`'s path, and generic and turbofish
/// arguments are dropped. References, `dyn` and extra `+` bounds on the
/// self type are ignored; a function-pointer self type becomes `fn`.
///
/// ```
/// use cerror::stack::{qualify, short_name};
///
/// assert_eq!(qualify("app::db::Conn::open"), "app/db.Conn.open");
/// assert_eq!(short_name(&qualify("app::db::Conn::open")), "Conn.open");
/// assert_eq!(short_name(&qualify("app::db::open")), "open");
/// assert_eq!(qualify("<alloc::vec::Vec<u8> as core::fmt::Debug>::fmt"), "alloc/vec.Vec.fmt");
/// ```
pub fn qualify(symbol: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for (i, seg) in split_path(symbol).into_iter().enumerate() {
        if seg.starts_with('<') && seg.ends_with('>') {
            if i > 0 {
                continue;
            }
            let inner = &seg[1..seg.len() - 1];
            let self_ty = match find_top_level(inner, " as ") {
                Some(n) => &inner[..n],
                None => inner,
            };
            segments.extend(self_type_path(self_ty));
        } else {
            segments.push(strip_generics(seg));
        }
    }

    // The function is the last segment that is not a `{{closure}}` marker.
    let func = segments
        .iter()
        .rposition(|s| !s.starts_with('{'))
        .unwrap_or(0);
    let modules = segments[..func]
        .iter()
        .take_while(|s| is_module(s))
        .count();

    let (path, rest) = segments.split_at(modules);
    if path.is_empty() {
        rest.join(".")
    } else {
        format!("{}.{}", path.join("/"), rest.join("."))
    }
}

/// Path segments naming an impl's self type.
///
/// `&dyn a::Fn<()> + a::Sync` → `[a, Fn]`, `fn() -> T` → `[fn]`,
/// `[u8]` and tuples stay one segment.
fn self_type_path(ty: &str) -> Vec<&str> {
    let mut ty = ty.trim();
    loop {
        let cur = ty;
        let stripped = ["&", "*const ", "*mut ", "mut ", "dyn ", "impl ", "'static "]
            .iter()
            .find_map(|prefix| cur.strip_prefix(*prefix));
        match stripped {
            Some(rest) => ty = rest.trim_start(),
            None => break,
        }
    }
    if let Some(n) = find_top_level(ty, " + ") {
        ty = &ty[..n];
    }
    if ty.starts_with("fn(") || ty.starts_with("unsafe ") || ty.starts_with("extern ") {
        return vec!["fn"];
    }
    if ty.starts_with('(') || ty.starts_with('[') {
        return vec![ty];
    }
    split_path(ty).into_iter().map(strip_generics).collect()
}

/// `Vec<u8>` → `Vec`. Segments that are entirely bracketed are left alone.
fn strip_generics(seg: &str) -> &str {
    match seg.find('<') {
        Some(n) if n > 0 => &seg[..n],
        _ => seg,
    }
}

/// Byte offset of `pat` outside any brackets.
fn find_top_level(s: &str, pat: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' if i == 0 || bytes[i - 1] != b'-' => depth -= 1,
            b')' | b']' => depth -= 1,
            _ if depth == 0 && bytes[i..].starts_with(pat.as_bytes()) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split on `::` outside of brackets.
fn split_path(path: &str) -> Vec<&str> {
    let bytes = path.as_bytes();
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' if i == 0 || bytes[i - 1] != b'-' => depth -= 1,
            b')' | b']' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                out.push(&path[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    out.push(&path[start..]);
    out.retain(|s| !s.is_empty());
    out
}

fn is_module(seg: &str) -> bool {
    let mut chars = seg.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_two_steps() {
        assert_eq!(short_name("pkg/path.Type.Method"), "Type.Method");
        assert_eq!(short_name("github.com/a/b.fooErr"), "fooErr");
        assert_eq!(short_name("main.main"), "main");
        assert_eq!(short_name("bare"), "bare");
        assert_eq!(short_name(""), "");
    }

    #[test]
    fn qualify_free_function() {
        assert_eq!(qualify("app::db::open"), "app/db.open");
        assert_eq!(qualify("main"), "main");
    }

    #[test]
    fn qualify_method() {
        assert_eq!(qualify("app::db::Conn::open"), "app/db.Conn.open");
        assert_eq!(short_name(&qualify("app::Conn::open")), "Conn.open");
    }

    #[test]
    fn qualify_trait_impl() {
        let q = qualify("<app::db::Conn as core::fmt::Display>::fmt");
        assert_eq!(q, "app/db.Conn.fmt");
        assert_eq!(short_name(&q), "Conn.fmt");
    }

    #[test]
    fn qualify_closure() {
        let q = qualify("std::rt::lang_start::{{closure}}");
        assert_eq!(q, "std/rt.lang_start.{{closure}}");
        assert_eq!(short_name(&q), "lang_start.{{closure}}");
    }

    #[test]
    fn qualify_drops_turbofish() {
        assert_eq!(qualify("app::parse::<u32>"), "app.parse");
        assert_eq!(short_name(&qualify("app::parse::<u32>")), "parse");
    }

    #[test]
    fn qualify_generic_self_type() {
        let q = qualify("<alloc::vec::Vec<u8> as core::fmt::Debug>::fmt");
        assert_eq!(q, "alloc/vec.Vec.fmt");
        assert_eq!(short_name(&q), "Vec.fmt");
    }

    #[test]
    fn qualify_fn_pointer_self_type() {
        let q = qualify(
            "<fn() -> core::result::Result<(), alloc::string::String> as core::ops::function::FnOnce<()>>::call_once",
        );
        assert_eq!(q, "fn.call_once");
        assert_eq!(short_name(&q), "call_once");
    }

    #[test]
    fn qualify_trait_object_self_type() {
        let q = qualify(
            "<&dyn core::ops::function::Fn<(), Output = i32> + core::marker::Sync + core::panic::unwind_safe::RefUnwindSafe as core::ops::function::FnOnce<()>>::call_once",
        );
        assert_eq!(q, "core/ops/function.Fn.call_once");
        assert_eq!(short_name(&q), "Fn.call_once");
    }

    #[test]
    fn qualify_slice_and_tuple_self_types() {
        assert_eq!(short_name(&qualify("<[u8] as core::fmt::Debug>::fmt")), "fmt");
        let q = qualify("<(alloc::string::String, u8) as core::fmt::Debug>::fmt");
        assert_eq!(short_name(&q), "fmt");
        assert!(!q.contains('/'), "got {}", q);
    }

    #[test]
    fn split_respects_generics() {
        assert_eq!(
            split_path("<alloc::vec::Vec<u8> as x::Y>::z"),
            vec!["<alloc::vec::Vec<u8> as x::Y>", "z"]
        );
    }

    #[test]
    fn empty_stack_renders_nothing() {
        let stack = Stack::EMPTY;
        assert!(stack.is_empty());
        assert!(stack.lines().is_empty());
        assert_eq!(stack.to_string(), "");
    }

    #[test]
    fn from_ips_is_bounded() {
        let ips: Vec<usize> = (1..=MAX_FRAMES * 2).collect();
        let stack = Stack::from_ips(&ips);
        assert_eq!(stack.len(), MAX_FRAMES);
        assert_eq!(stack.ips()[0], 1);
    }

    #[test]
    fn capture_disabled_is_empty() {
        let config = StackConfig::new().capture(false);
        assert!(Stack::capture_with(&config, 0).is_empty());
    }

    #[test]
    fn capture_respects_depth() {
        let config = StackConfig::new().depth(2);
        let stack = Stack::capture_with(&config, 0);
        assert!(stack.len() <= 2);
    }

    #[test]
    fn capture_starts_at_caller() {
        let stack = Stack::capture_with(&StackConfig::new(), 0);
        let line = line!() - 1;
        assert!(!stack.is_empty());
        let first = &stack.frames()[0];
        assert!(first.file.ends_with("stack.rs"), "got {:?}", first);
        assert_eq!(first.line, line, "got {:?}", first);
        assert!(first.function.contains("capture_starts_at_caller"));
    }

    #[test]
    fn shallow_capture_still_starts_at_caller() {
        let stack = Stack::capture_with(&StackConfig::new().depth(1), 0);
        let line = line!() - 1;
        assert_eq!(stack.len(), 1);
        let first = &stack.frames()[0];
        assert!(first.function.contains("shallow_capture_still_starts_at_caller"), "got {:?}", first);
        assert_eq!(first.line, line, "got {:?}", first);
    }

    #[test]
    fn captured_frames_have_addresses() {
        let stack = Stack::capture_with(&StackConfig::new(), 0);
        assert!(stack.ips().iter().all(|&ip| ip != 0), "got {:?}", stack.ips());
    }

    #[test]
    fn rendering_is_idempotent() {
        let stack = Stack::capture_with(&StackConfig::new(), 0);
        assert_eq!(stack.lines(), stack.lines());
    }

    #[test]
    fn unresolved_frame_names_address() {
        let frame = Frame::unresolved(0x10);
        assert_eq!(frame.to_string(), "?:0\t0x10");
    }
}
