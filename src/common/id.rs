//! Chord node Id or a lookup target, and the identifier space they live in.
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha1_smol::Sha1;
use std::fmt::{self, Debug, Display, Formatter};

use crate::{Error, Result};

/// The largest supported identifier space, in bits.
///
/// Keys are hashed to 32 bits before being reduced into the ring, so a wider
/// ring would leave most of it unreachable.
pub const MAX_ID_BITS: u8 = 32;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Position of a node or a key on the ring.
pub struct Id(pub u64);

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Id(value)
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The modular ring of `2^bits` identifiers.
pub struct IdSpace {
    bits: u8,
}

impl IdSpace {
    /// Create an identifier space of `2^bits` ids. Returns Err if `bits` is
    /// zero or larger than [MAX_ID_BITS].
    pub fn new(bits: u8) -> Result<Self> {
        if bits == 0 || bits > MAX_ID_BITS {
            return Err(Error::InvalidIdBits(bits));
        }

        Ok(IdSpace { bits })
    }

    /// Number of bits, also the number of entries in every finger table.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Number of identifiers on the ring.
    pub fn size(&self) -> u64 {
        1 << self.bits
    }

    /// Returns Err if `id` is not on this ring.
    pub fn check(&self, id: Id) -> Result<Id> {
        if id.0 >= self.size() {
            return Err(Error::IdOutOfRange {
                id,
                bits: self.bits,
            });
        }

        Ok(id)
    }

    /// Map a key onto the ring.
    ///
    /// The first four bytes of the key's sha1 digest, read as a big-endian
    /// `u32`, reduced modulo the ring size.
    pub fn hash(&self, key: &str) -> Id {
        let mut hasher = Sha1::new();
        hasher.update(key.as_bytes());
        let bytes = hasher.digest().bytes();

        let hash = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        Id(u64::from(hash) % self.size())
    }

    /// A uniformly random Id on this ring.
    pub fn random(&self) -> Id {
        let mut rng = rand::thread_rng();

        Id(rng.gen_range(0..self.size()))
    }

    /// The start of finger `index` of `id`: `(id + 2^index) mod 2^bits`.
    pub fn finger_start(&self, id: Id, index: u8) -> Id {
        Id((id.0 + (1 << index)) % self.size())
    }
}
