//! Call id ordering of overlay requests.
//!
//! Requests carry a caller-assigned, increasing call id but may arrive out of
//! order. Draws run as soon as they reach the head of the queue; barriers
//! (group switches, freezes) wait until every earlier id has been processed.

use std::time::{Duration, Instant};

use crate::OverlayCommand;

/// How long a barrier may wait for a missing predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueuePolicy {
	/// `None` waits forever.
	pub stall_timeout: Option<Duration>,
}

#[derive(Debug)]
struct Pending {
	call_id: u32,
	command: OverlayCommand,
}

#[derive(Debug, Default)]
pub struct CallQueue {
	pending: Vec<Pending>,
	last_call_id: Option<u32>,
	/// Head barrier that is currently waiting, and since when.
	stalled: Option<(u32, Instant)>,
	policy: QueuePolicy,
}

impl CallQueue {
	pub fn new(policy: QueuePolicy) -> Self {
		Self {
			policy,
			..Self::default()
		}
	}

	pub fn policy(&self) -> QueuePolicy {
		self.policy
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	pub fn last_call_id(&self) -> Option<u32> {
		self.last_call_id
	}

	/// Drop everything pending and forget the last processed id.
	pub fn reset(&mut self) {
		self.pending.clear();
		self.last_call_id = None;
		self.stalled = None;
	}

	/// Insert keeping the queue sorted by call id; equal ids keep arrival order.
	pub fn push(&mut self, call_id: u32, command: OverlayCommand) {
		let at = self.pending.partition_point(|p| p.call_id <= call_id);
		self.pending.insert(at, Pending { call_id, command });
	}

	/// Pop the head if it may run now.
	pub fn pop_ready(&mut self, now: Instant) -> Option<(u32, OverlayCommand)> {
		let head = self.pending.first()?;

		if head.command.is_barrier()
			&& let Some(last) = self.last_call_id
			&& last.checked_add(1) != Some(head.call_id)
		{
			let since = match self.stalled {
				Some((id, since)) if id == head.call_id => since,
				_ => {
					tracing::debug!(call_id = head.call_id, last_call_id = last, "barrier waiting for earlier calls");
					self.stalled = Some((head.call_id, now));
					now
				}
			};

			match self.policy.stall_timeout {
				Some(limit) if now.saturating_duration_since(since) >= limit => {
					tracing::warn!(
						call_id = head.call_id,
						last_call_id = last,
						command = head.command.name(),
						"barrier stalled too long; running it out of order"
					);
				}
				_ => return None,
			}
		}

		self.stalled = None;
		let head = self.pending.remove(0);
		self.last_call_id = Some(head.call_id);
		Some((head.call_id, head.command))
	}

	/// When a stalled barrier will be forced through, if the policy allows it.
	pub fn stall_deadline(&self) -> Option<Instant> {
		let (_, since) = self.stalled?;
		Some(since + self.policy.stall_timeout?)
	}
}
