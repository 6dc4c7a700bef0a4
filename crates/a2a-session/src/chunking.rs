//! Chunked transfer framing for payloads exceeding the transport MTU.

use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Default maximum chunk payload size, chosen well under common transport
/// MTUs (1500-byte Ethernet frames minus IP/TCP/TLS overhead).
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// One fragment of a larger payload, carried as the `payload` of a
/// `SecureMessage` with `msg_type = "chunk"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub transfer_id: String,
    pub index: u32,
    pub total: u32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Splits `payload` into [`Chunk`]s of at most `chunk_size` bytes each.
/// Always emits at least one chunk, even for an empty payload.
pub fn split_into_chunks(transfer_id: impl Into<String>, payload: &[u8], chunk_size: usize) -> Vec<Chunk> {
    let transfer_id = transfer_id.into();
    let total = ((payload.len().max(1)) as f64 / chunk_size as f64).ceil() as u32;
    let total = total.max(1);
    (0..total)
        .map(|i| {
            let start = i as usize * chunk_size;
            let end = (start + chunk_size).min(payload.len());
            Chunk {
                transfer_id: transfer_id.clone(),
                index: i,
                total,
                data: payload[start..end].to_vec(),
            }
        })
        .collect()
}

struct PartialTransfer {
    total: u32,
    received: HashMap<u32, Vec<u8>>,
}

/// Buffers incoming chunks by `transfer_id` until a transfer is complete,
/// then reassembles the original payload in order. Bounded by the sender
/// declaring `total` up front; a transfer that never completes leaks one
/// entry until the owning session is torn down, same lifetime as the
/// session's other per-peer state.
pub struct Reassembler {
    transfers: DashMap<String, PartialTransfer>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self {
            transfers: DashMap::new(),
        }
    }

    /// Accepts one chunk, returning the reassembled payload once all
    /// `total` chunks for its `transfer_id` have arrived.
    pub fn accept(&self, chunk: Chunk) -> Result<Option<Vec<u8>>, SessionError> {
        if chunk.index >= chunk.total {
            return Err(SessionError::HandshakeFailed(format!(
                "chunk index {} out of range for total {}",
                chunk.index, chunk.total
            )));
        }

        let mut entry = self.transfers.entry(chunk.transfer_id.clone()).or_insert_with(|| PartialTransfer {
            total: chunk.total,
            received: HashMap::new(),
        });

        if entry.total != chunk.total {
            return Err(SessionError::HandshakeFailed("inconsistent chunk total for transfer".into()));
        }
        entry.received.insert(chunk.index, chunk.data);

        if entry.received.len() as u32 == entry.total {
            let total = entry.total;
            let received = std::mem::take(&mut entry.received);
            drop(entry);
            self.transfers.remove(&chunk.transfer_id);

            let mut payload = Vec::new();
            for i in 0..total {
                let part = received
                    .get(&i)
                    .ok_or_else(|| SessionError::HandshakeFailed("missing chunk during reassembly".into()))?;
                payload.extend_from_slice(part);
            }
            Ok(Some(payload))
        } else {
            Ok(None)
        }
    }

    pub fn pending_transfers(&self) -> usize {
        self.transfers.len()
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
