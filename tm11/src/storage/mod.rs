//! The backing store: where tape images live and how requests against
//! them are carried out.
//!
//! The controller only ever sees [`IoRequest`] and [`IoCompletion`];
//! something implementing [`TapeStorage`] turns one into the other.
//! [`TapeLibrary`] is the usual implementation, holding one
//! [`TapeImage`] per backing identifier.
use std::collections::BTreeMap;
use std::path::Path;

use tracing::{event, Level};

use crate::io::{IoCompletion, IoKind, IoRequest, IoStatus, HEADER_WORDS};
use crate::memory::HostMemory;
use crate::unit::{BackingId, UnitNumber};

mod image;

pub use image::{
    payload_words, TapeEntry, TapeImage, TapeImageBuilder, TapeImageError, Transfer,
    END_OF_MEDIUM, MARKER_THRESHOLD, TAPE_MARK,
};

pub trait TapeStorage {
    /// Carry out `request`, moving any data into `memory`.
    fn perform(&mut self, request: &IoRequest, memory: &mut dyn HostMemory) -> IoCompletion;
}

#[derive(Debug, Default)]
pub struct TapeLibrary {
    images: BTreeMap<BackingId, TapeImage>,
}

impl TapeLibrary {
    pub fn new() -> TapeLibrary {
        TapeLibrary::default()
    }

    /// Make `image` available under `id`, returning any image it
    /// replaces.
    pub fn mount(&mut self, id: BackingId, image: TapeImage) -> Option<TapeImage> {
        event!(Level::INFO, "mounting {} bytes of tape as {id}", image.len());
        self.images.insert(id, image)
    }

    /// Mount `image` on the drive `unit`.
    pub fn mount_on(&mut self, unit: UnitNumber, image: TapeImage) -> Option<TapeImage> {
        self.mount(BackingId::for_unit(unit), image)
    }

    pub fn unmount(&mut self, id: &BackingId) -> Option<TapeImage> {
        self.images.remove(id)
    }

    pub fn get(&self, id: &BackingId) -> Option<&TapeImage> {
        self.images.get(id)
    }

    pub fn mounted(&self) -> impl Iterator<Item = &BackingId> {
        self.images.keys()
    }

    /// Mount whichever of `tm0.tap` .. `tm3.tap` exist in `dir`.
    /// Returns the identifiers of the images mounted.
    pub fn load_directory(&mut self, dir: &Path) -> Result<Vec<BackingId>, TapeImageError> {
        let mut loaded = Vec::new();
        for unit in UnitNumber::all() {
            let id = BackingId::for_unit(unit);
            let path = dir.join(id.as_str());
            if !path.is_file() {
                event!(Level::DEBUG, "no tape image at {}", path.display());
                continue;
            }
            let image = TapeImage::load(&path)?;
            self.mount(id.clone(), image);
            loaded.push(id);
        }
        Ok(loaded)
    }
}

impl TapeStorage for TapeLibrary {
    fn perform(&mut self, request: &IoRequest, memory: &mut dyn HostMemory) -> IoCompletion {
        event!(Level::TRACE, "performing {request}");
        let Some(image) = self.images.get(&request.backing) else {
            event!(
                Level::WARN,
                "unit {} has no tape mounted ({} is missing)",
                request.unit,
                request.backing
            );
            return IoCompletion {
                unit: request.unit,
                status: IoStatus::DataError,
                position: request.position,
                value: 0,
                count: request.length,
            };
        };
        match request.kind {
            IoKind::HeaderProbe => IoCompletion {
                unit: request.unit,
                status: IoStatus::Ok,
                position: request.position + HEADER_WORDS,
                value: image.header_at(request.position),
                count: 0,
            },
            IoKind::DataTransfer => {
                let t = image.transfer(request.position, request.address, request.length, memory);
                IoCompletion {
                    unit: request.unit,
                    status: t.status,
                    position: t.position,
                    value: u32::from(t.address),
                    count: t.residual,
                }
            }
        }
    }
}
