use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Bounded tail of a job's output lines, for progress display only.
#[derive(Debug, Clone)]
pub struct PreviewBuffer {
	inner: Arc<Mutex<VecDeque<String>>>,
	capacity: usize,
}

impl PreviewBuffer {
	pub fn new(capacity: usize) -> Self {
		Self {
			inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
			capacity,
		}
	}

	pub fn push(&self, line: String) {
		if self.capacity == 0 {
			return;
		}
		let mut lines = self.inner.lock();
		if lines.len() >= self.capacity {
			lines.pop_front();
		}
		lines.push_back(line);
	}

	/// Copy of the buffered lines, oldest first.
	pub fn snapshot(&self) -> Vec<String> {
		self.inner.lock().iter().cloned().collect()
	}

	/// Reads `stream` line by line into the buffer until it closes.
	pub(crate) async fn capture<R>(self, stream: R)
	where
		R: AsyncRead + Unpin,
	{
		let mut lines = BufReader::new(stream).lines();
		while let Ok(Some(line)) = lines.next_line().await {
			self.push(line);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_only_the_tail() {
		let buf = PreviewBuffer::new(2);
		buf.push("a".into());
		buf.push("b".into());
		buf.push("c".into());
		assert_eq!(buf.snapshot(), vec!["b", "c"]);
	}

	#[tokio::test]
	async fn capture_reads_until_eof() {
		let buf = PreviewBuffer::new(8);
		buf.clone().capture(&b"one\ntwo\n"[..]).await;
		assert_eq!(buf.snapshot(), vec!["one", "two"]);
	}
}
