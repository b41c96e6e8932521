//! Ordering of asynchronous surface loads.
//!
//! Parsing happens off the render loop, so completions can arrive in any
//! order. Every request is stamped with a [`LoadTicket`] from a monotonically
//! increasing counter and only the completion carrying the most recently
//! issued ticket is ever accepted. Anything older is stale and dropped, so a
//! slow parse of an earlier upload can never replace a newer one.

use crate::resources::{LoadError, mesh::SurfaceData};

/// Identifies one load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A finished parse on its way back to the render loop.
#[derive(Debug)]
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub name: String,
    pub result: Result<SurfaceData, LoadError>,
}

impl LoadCompletion {
    /// Parse `bytes` synchronously and wrap the outcome.
    pub fn parse(ticket: LoadTicket, name: String, bytes: &[u8]) -> Self {
        let result = crate::resources::parse_surface(&name, bytes);
        Self {
            ticket,
            name,
            result,
        }
    }
}

/// What the render loop should do with a completion.
#[derive(Debug)]
pub enum Accepted {
    /// The latest request succeeded; swap the surface in.
    Surface(SurfaceData),
    /// The latest request failed; keep whatever is currently shown.
    Failed(LoadError),
    /// A newer request has been issued since; ignore this one.
    Stale,
}

/// Issues tickets and decides which completions are still wanted.
#[derive(Debug, Default)]
pub struct SurfaceLoader {
    latest: u64,
}

impl SurfaceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request, superseding all earlier ones.
    pub fn issue(&mut self) -> LoadTicket {
        self.latest += 1;
        LoadTicket(self.latest)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest
    }

    pub fn accept(&self, completion: LoadCompletion) -> Accepted {
        if !self.is_current(completion.ticket) {
            log::warn!(
                "discarding stale load of {} (ticket {}, latest {})",
                completion.name,
                completion.ticket.0,
                self.latest
            );
            return Accepted::Stale;
        }
        match completion.result {
            Ok(surface) => {
                log::info!(
                    "loaded {}: {} triangles",
                    completion.name,
                    surface.triangle_count()
                );
                Accepted::Surface(surface)
            }
            Err(e) => {
                log::error!("failed to load {}: {}", completion.name, e);
                Accepted::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::stl::tests::TETRAHEDRON;

    fn completion(ticket: LoadTicket, name: &str) -> LoadCompletion {
        LoadCompletion::parse(ticket, name.to_string(), TETRAHEDRON.as_bytes())
    }

    #[test]
    fn tickets_increase() {
        let mut loader = SurfaceLoader::new();
        let a = loader.issue();
        let b = loader.issue();
        assert!(b > a);
        assert!(loader.is_current(b));
        assert!(!loader.is_current(a));
    }

    #[test]
    fn only_the_latest_upload_is_accepted_in_order() {
        let mut loader = SurfaceLoader::new();
        let a = loader.issue();
        let b = loader.issue();
        assert!(matches!(loader.accept(completion(a, "a.stl")), Accepted::Stale));
        match loader.accept(completion(b, "b.stl")) {
            Accepted::Surface(surface) => assert_eq!(surface.name, "b.stl"),
            other => panic!("expected b, got {:?}", other),
        }
    }

    #[test]
    fn only_the_latest_upload_is_accepted_out_of_order() {
        let mut loader = SurfaceLoader::new();
        let a = loader.issue();
        let b = loader.issue();
        let late_a = completion(a, "a.stl");
        match loader.accept(completion(b, "b.stl")) {
            Accepted::Surface(surface) => assert_eq!(surface.name, "b.stl"),
            other => panic!("expected b, got {:?}", other),
        }
        assert!(matches!(loader.accept(late_a), Accepted::Stale));
    }

    #[test]
    fn failures_of_the_latest_request_are_reported() {
        let mut loader = SurfaceLoader::new();
        let ticket = loader.issue();
        let broken = LoadCompletion::parse(ticket, "broken.stl".to_string(), b"solid x\nvertex 1 2");
        assert!(matches!(loader.accept(broken), Accepted::Failed(_)));
    }
}
