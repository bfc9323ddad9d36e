//! In-memory services for driving whole runs.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use boxsmith_core::{
    ArtworkSource, CanonicalCollection, CollectionMember, CollectionProvider,
    CreateRequestOutcome, ExternalId, Grouping, LibraryItem, LibraryService, Lookup, PosterRef,
    RequestService, RequestStatus, RetryPolicy, RunConfig, ServiceError,
};

pub fn id(n: u64) -> ExternalId {
    ExternalId::new(n)
}

/// Config for a live (non dry) run with no waiting between retries.
pub fn live_config() -> RunConfig {
    RunConfig {
        dry_run: false,
        retry: RetryPolicy::immediate(),
        ..RunConfig::default()
    }
}

pub fn collection(cid: u64, name: &str, members: &[u64], poster: Option<&str>) -> CanonicalCollection {
    CanonicalCollection {
        id: id(cid),
        name: name.into(),
        members: members
            .iter()
            .map(|&m| CollectionMember {
                id: id(m),
                title: format!("Movie {m}"),
                release_date: Some("2001-01-01".into()),
            })
            .collect(),
        poster: poster.map(|p| PosterRef(p.into())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create(String),
    Add(String, Vec<String>),
    Artwork(String),
}

/// A media server whose groupings change as the engine mutates them.
#[derive(Default)]
pub struct FakeLibrary {
    items: Vec<LibraryItem>,
    groupings: RefCell<BTreeMap<String, Grouping>>,
    next_id: Cell<u32>,
    pub mutations: RefCell<Vec<Mutation>>,
    /// Grouping names whose creation fails.
    pub broken_names: Vec<String>,
    pub unreachable: bool,
    /// Creates that go through on the server but whose response times out.
    pub lost_creates: Cell<u32>,
    /// Errors returned by the next `add_members` calls, before any change.
    pub add_failures: RefCell<VecDeque<ServiceError>>,
}

impl FakeLibrary {
    /// Items `jf-<n>` titled "Movie n" for each catalog id.
    pub fn with_movies(ids: &[u64]) -> Self {
        Self {
            items: ids
                .iter()
                .map(|&n| LibraryItem::new(format!("jf-{n}"), Some(id(n)), &format!("Movie {n}")))
                .collect(),
            ..Self::default()
        }
    }

    /// A server that refuses every connection.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn add_item(&mut self, item: LibraryItem) {
        self.items.push(item);
    }

    pub fn add_grouping(&self, gid: &str, name: &str, members: &[u64], has_artwork: bool) {
        self.groupings.borrow_mut().insert(
            gid.into(),
            Grouping {
                id: gid.into(),
                name: name.into(),
                member_ids: members.iter().map(|n| format!("jf-{n}")).collect(),
                has_artwork,
            },
        );
    }

    pub fn grouping_named(&self, name: &str) -> Option<Grouping> {
        self.groupings
            .borrow()
            .values()
            .find(|g| g.name == name)
            .cloned()
    }

    pub fn grouping_count(&self) -> usize {
        self.groupings.borrow().len()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.borrow().len()
    }
}

impl LibraryService for FakeLibrary {
    async fn list_items(&self, _include_grouped: bool) -> Result<Vec<LibraryItem>, ServiceError> {
        if self.unreachable {
            return Err(ServiceError::Connection("connection refused".into()));
        }
        let groupings = self.groupings.borrow();
        Ok(self
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                item.grouping_ids = groupings
                    .values()
                    .filter(|g| g.member_ids.contains(&item.server_id))
                    .map(|g| g.id.clone())
                    .collect::<BTreeSet<_>>();
                item
            })
            .collect())
    }

    async fn list_groupings(&self) -> Result<Vec<Grouping>, ServiceError> {
        Ok(self.groupings.borrow().values().cloned().collect())
    }

    async fn create_grouping(&self, name: &str) -> Result<String, ServiceError> {
        if self.broken_names.iter().any(|n| n == name) {
            return Err(ServiceError::Rejected {
                status: 400,
                message: "bad name".into(),
            });
        }
        self.next_id.set(self.next_id.get() + 1);
        let gid = format!("box-{}", self.next_id.get());
        self.groupings.borrow_mut().insert(
            gid.clone(),
            Grouping {
                id: gid.clone(),
                name: name.into(),
                member_ids: BTreeSet::new(),
                has_artwork: false,
            },
        );
        self.mutations.borrow_mut().push(Mutation::Create(name.into()));
        if self.lost_creates.get() > 0 {
            self.lost_creates.set(self.lost_creates.get() - 1);
            return Err(ServiceError::Timeout);
        }
        Ok(gid)
    }

    async fn add_members(&self, grouping_id: &str, member_ids: &[String]) -> Result<(), ServiceError> {
        if let Some(e) = self.add_failures.borrow_mut().pop_front() {
            return Err(e);
        }
        let mut groupings = self.groupings.borrow_mut();
        let grouping = groupings.get_mut(grouping_id).ok_or(ServiceError::NotFound)?;
        grouping.member_ids.extend(member_ids.iter().cloned());
        self.mutations
            .borrow_mut()
            .push(Mutation::Add(grouping_id.into(), member_ids.to_vec()));
        Ok(())
    }

    async fn set_artwork(&self, grouping_id: &str, _image: &[u8]) -> Result<(), ServiceError> {
        let mut groupings = self.groupings.borrow_mut();
        let grouping = groupings.get_mut(grouping_id).ok_or(ServiceError::NotFound)?;
        grouping.has_artwork = true;
        self.mutations
            .borrow_mut()
            .push(Mutation::Artwork(grouping_id.into()));
        Ok(())
    }
}

/// Canonical membership keyed by catalog id.
#[derive(Default)]
pub struct FakeProvider {
    by_movie: HashMap<ExternalId, CanonicalCollection>,
    pub lookups: RefCell<Vec<ExternalId>>,
}

impl FakeProvider {
    pub fn with(collections: &[CanonicalCollection]) -> Self {
        let mut by_movie = HashMap::new();
        for c in collections {
            for m in c.member_ids() {
                by_movie.entry(m).or_insert_with(|| c.clone());
            }
        }
        Self {
            by_movie,
            lookups: RefCell::default(),
        }
    }
}

impl CollectionProvider for FakeProvider {
    async fn resolve(&self, id: ExternalId) -> Lookup {
        self.lookups.borrow_mut().push(id);
        match self.by_movie.get(&id) {
            Some(c) => Lookup::Found(c.clone()),
            None => Lookup::NoCollection,
        }
    }
}

#[derive(Default)]
pub struct FakeArtwork {
    pub fetches: RefCell<Vec<PosterRef>>,
    /// Every fetch fails with a 404.
    pub broken: bool,
}

impl ArtworkSource for FakeArtwork {
    async fn fetch_artwork(&self, poster: &PosterRef) -> Result<Vec<u8>, ServiceError> {
        self.fetches.borrow_mut().push(poster.clone());
        if self.broken {
            return Err(ServiceError::NotFound);
        }
        Ok(vec![0xff, 0xd8, 0xff])
    }
}

/// Request service that remembers every request it accepts.
#[derive(Default)]
pub struct FakeRequests {
    pub existing: RefCell<HashMap<ExternalId, RequestStatus>>,
    pub creates: RefCell<Vec<ExternalId>>,
}

impl RequestService for FakeRequests {
    async fn find_request(&self, id: ExternalId) -> Result<Option<RequestStatus>, ServiceError> {
        Ok(self.existing.borrow().get(&id).copied())
    }

    async fn create_request(&self, id: ExternalId) -> Result<CreateRequestOutcome, ServiceError> {
        self.creates.borrow_mut().push(id);
        let mut existing = self.existing.borrow_mut();
        if existing.contains_key(&id) {
            return Ok(CreateRequestOutcome::Duplicate);
        }
        existing.insert(id, RequestStatus::Pending);
        Ok(CreateRequestOutcome::Created {
            request_id: format!("r{id}"),
        })
    }
}
