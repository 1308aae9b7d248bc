//! # Server-sent-event framing for live log endpoints.
//!
//! The HTTP layer lives outside this crate, but the wire framing of the live
//! log feed is part of the orchestrator contract, so the formatting rules are
//! kept here next to the stream they frame:
//!
//! - every physical line of a chunk is prefixed `data: `;
//! - stream end is an `event: end` line followed by a `data: ` line saying
//!   whether the job finished or was never found;
//! - frames are terminated by a blank line.

/// Frames one log chunk, re-prefixing each physical line.
///
/// # Example
/// ```
/// use fetchvisor::logs::sse;
///
/// assert_eq!(sse::data_frame("a\nb"), "data: a\ndata: b\n\n");
/// assert_eq!(sse::data_frame("single"), "data: single\n\n");
/// ```
pub fn data_frame(chunk: &str) -> String {
    let mut out = String::with_capacity(chunk.len() + 16);
    let mut any = false;
    for line in chunk.lines() {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
        any = true;
    }
    if !any {
        out.push_str("data: \n");
    }
    out.push('\n');
    out
}

/// Frames the terminal event of a log feed.
///
/// `found` distinguishes a finished job from a job id the registry never had.
pub fn end_frame(found: bool) -> String {
    let message = if found { "Job finished" } else { "Job not found" };
    format!("event: end\ndata: {message}\n\n")
}
