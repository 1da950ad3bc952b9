use std::io::{
	Error,
	ErrorKind,
	Read,
	Result
};

/// Sequential cursor over an SCW buffer.
///
/// Besides the read offset, the cursor keeps a signed byte budget for the chunk being decoded.
/// The container seeds it with the declared chunk length and every read subtracts from it, so a
/// decoder that over- or under-reads leaves a nonzero budget behind. The budget is allowed to go
/// negative; it is up to the caller to reject anything but zero.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
	data: &'a [u8],
	offset: usize,
	budget: i64,
}

impl<'a> Reader<'a> {
	pub fn new(data: &'a [u8]) -> Reader<'a> {
		Reader {
			data: data,
			offset: 0,
			budget: 0,
		}
	}

	/// Current read offset from the start of the buffer
	pub fn position(&self) -> usize {
		self.offset
	}

	/// Bytes left in the underlying buffer
	pub fn remaining(&self) -> usize {
		self.data.len() - self.offset
	}

	/// Bytes left in the current chunk
	pub fn budget(&self) -> i64 {
		self.budget
	}

	/// Resets the chunk budget at a chunk boundary
	pub fn set_budget(&mut self, length: u32) {
		self.budget = length as i64;
	}

	/// Returns the bytes consumed since `start`
	pub fn consumed_since(&self, start: usize) -> &'a [u8] {
		&self.data[start.min(self.offset)..self.offset]
	}

	/// Consumes exactly `n` bytes. Nothing is consumed if fewer than `n` remain.
	pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(Error::new(ErrorKind::UnexpectedEof,
				format!("short buffer: wanted {} bytes at offset {}, {} left", n, self.offset,
					self.remaining())));
		}

		let out = &self.data[self.offset..self.offset + n];
		self.offset += n;
		self.budget -= n as i64;

		Ok(out)
	}
}

impl Read for Reader<'_> {
	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let n = buf.len().min(self.remaining());
		buf[..n].copy_from_slice(self.take(n)?);

		Ok(n)
	}

	fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
		buf.copy_from_slice(self.take(buf.len())?);

		Ok(())
	}
}
