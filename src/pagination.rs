use log::debug;

use crate::{
    model::TorrentListPage,
    rpc::{RpcResult, TorrentService},
};

/// Number of pages needed to show `total` torrents, `0` only for an empty
/// collection.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Keeps the requested page index pointing at a page the daemon actually has.
#[derive(Debug, Clone)]
pub struct PaginationCoordinator {
    page_size: usize,
}

impl PaginationCoordinator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Takes effect on the next request; nothing is fetched here.
    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size > 0 {
            self.page_size = page_size;
        }
    }

    /// Fetches `target` and returns the page together with the index that
    /// should be treated as current from now on.
    ///
    /// A page-out-of-range rejection steps back one page and asks again,
    /// until the daemon accepts or page 0 is reached. Any other failure is
    /// returned as is. An empty page at a non-zero index is kept, but the
    /// resolved index is moved one page back.
    pub fn request_page<S>(&self, service: &S, target: usize) -> RpcResult<(TorrentListPage, usize)>
    where
        S: TorrentService + ?Sized,
    {
        let mut page = target;
        loop {
            match service.list(page, self.page_size) {
                Ok(list) => {
                    let resolved = if list.torrents.is_empty() && page > 0 {
                        page - 1
                    } else {
                        page
                    };
                    if resolved != target {
                        debug!("requested page {target}, resolved to {resolved}");
                    }
                    return Ok((list, resolved));
                }
                Err(err) if err.is_page_out_of_range() && page > 0 => {
                    debug!("page {page} out of range, stepping back");
                    page -= 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        form::AddSource,
        model::{InfoHash, Torrent, TorrentProperties, TorrentSettings},
        rpc::{PauseAction, PorlaError, PAGE_OUT_OF_RANGE},
    };

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        List(usize, usize),
        Add(String, String, AddSource),
        Remove(String, bool),
        Move(String, String),
        PauseResume(String),
        Properties(String),
        SetProperties(String, TorrentSettings),
    }

    /// In-memory daemon. Rejects pages past the end with the out-of-range
    /// error code, like the real one, unless `empty_past_end` asks for an
    /// empty page instead.
    pub struct FakeDaemon {
        pub torrents: RefCell<Vec<Torrent>>,
        pub calls: RefCell<Vec<Call>>,
        pub properties: Option<TorrentProperties>,
        pub fail_mutations: bool,
        pub fail_list: bool,
        pub empty_past_end: bool,
    }

    impl FakeDaemon {
        pub fn with_torrents(count: usize) -> Self {
            Self {
                torrents: RefCell::new((0..count).map(torrent).collect()),
                calls: RefCell::new(Vec::new()),
                properties: Some(TorrentProperties::default()),
                fail_mutations: false,
                fail_list: false,
                empty_past_end: false,
            }
        }

        pub fn truncate(&self, count: usize) {
            self.torrents.borrow_mut().truncate(count);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        pub fn mutations(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|call| !matches!(call, Call::List(..) | Call::Properties(_)))
                .collect()
        }

        fn record(&self, call: Call) -> RpcResult<()> {
            self.calls.borrow_mut().push(call);
            if self.fail_mutations {
                return Err(PorlaError::Rpc {
                    code: -1,
                    message: "daemon refused".to_string(),
                });
            }
            Ok(())
        }
    }

    pub fn torrent(index: usize) -> Torrent {
        Torrent {
            name: format!("torrent-{index}"),
            info_hash: InfoHash::new(format!("{index:040x}"), None),
            save_path: format!("/data/{index}"),
            ..Torrent::default()
        }
    }

    impl TorrentService for FakeDaemon {
        fn list(&self, page: usize, page_size: usize) -> RpcResult<TorrentListPage> {
            self.calls.borrow_mut().push(Call::List(page, page_size));
            if self.fail_list {
                return Err(PorlaError::Rpc {
                    code: -32603,
                    message: "internal error".to_string(),
                });
            }
            let torrents = self.torrents.borrow();
            let total = torrents.len();
            if page > 0 && page >= page_count(total, page_size) && !self.empty_past_end {
                return Err(PorlaError::Rpc {
                    code: PAGE_OUT_OF_RANGE,
                    message: "page out of range".to_string(),
                });
            }
            let start = page * page_size;
            let end = (start + page_size).min(total);
            Ok(TorrentListPage {
                page,
                page_size,
                torrents: torrents.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
                torrents_total: total,
            })
        }

        fn add(&self, source: &str, save_path: &str, mode: AddSource) -> RpcResult<()> {
            self.record(Call::Add(source.to_string(), save_path.to_string(), mode))
        }

        fn remove(&self, torrent: &Torrent, keep_data: bool) -> RpcResult<()> {
            self.record(Call::Remove(torrent.name.clone(), keep_data))?;
            self.torrents
                .borrow_mut()
                .retain(|candidate| candidate.info_hash != torrent.info_hash);
            Ok(())
        }

        fn move_storage(&self, torrent: &Torrent, path: &str) -> RpcResult<()> {
            self.record(Call::Move(torrent.name.clone(), path.to_string()))
        }

        fn pause_or_resume(&self, torrent: &Torrent) -> RpcResult<PauseAction> {
            self.record(Call::PauseResume(torrent.name.clone()))?;
            let action = if torrent.is_paused() {
                PauseAction::Resumed
            } else {
                PauseAction::Paused
            };
            for candidate in self.torrents.borrow_mut().iter_mut() {
                if candidate.info_hash == torrent.info_hash {
                    candidate.flags ^= crate::model::FLAG_PAUSED;
                }
            }
            Ok(action)
        }

        fn properties(&self, torrent: &Torrent) -> RpcResult<TorrentProperties> {
            self.calls
                .borrow_mut()
                .push(Call::Properties(torrent.name.clone()));
            self.properties.clone().ok_or(PorlaError::Rpc {
                code: -1,
                message: "torrent not found".to_string(),
            })
        }

        fn set_properties(&self, torrent: &Torrent, settings: &TorrentSettings) -> RpcResult<()> {
            self.record(Call::SetProperties(torrent.name.clone(), *settings))
        }
    }

    #[test]
    fn page_count_rounds_up_and_is_zero_only_when_empty() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(25, 10), 3);
    }

    #[test]
    fn last_partial_page_is_returned_as_is() {
        let daemon = FakeDaemon::with_torrents(25);
        let coordinator = PaginationCoordinator::new(10);

        let (list, page) = coordinator.request_page(&daemon, 2).unwrap();

        assert_eq!(page, 2);
        assert_eq!(list.torrents.len(), 5);
        assert_eq!(page_count(list.torrents_total, 10), 3);
    }

    #[test]
    fn out_of_range_page_steps_back_to_last_page() {
        let daemon = FakeDaemon::with_torrents(25);
        let coordinator = PaginationCoordinator::new(10);

        let (list, page) = coordinator.request_page(&daemon, 3).unwrap();

        assert_eq!(page, 2);
        assert_eq!(list.torrents.len(), 5);
        assert_eq!(daemon.calls(), vec![Call::List(3, 10), Call::List(2, 10)]);
    }

    #[test]
    fn steps_back_one_page_at_a_time_after_a_large_shrink() {
        let daemon = FakeDaemon::with_torrents(12);
        let coordinator = PaginationCoordinator::new(10);

        let (list, page) = coordinator.request_page(&daemon, 4).unwrap();

        assert_eq!(page, 1);
        assert_eq!(list.torrents.len(), 2);
        assert_eq!(
            daemon.calls(),
            vec![
                Call::List(4, 10),
                Call::List(3, 10),
                Call::List(2, 10),
                Call::List(1, 10)
            ]
        );
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut daemon = FakeDaemon::with_torrents(25);
        daemon.fail_list = true;
        let coordinator = PaginationCoordinator::new(10);

        let err = coordinator.request_page(&daemon, 2).unwrap_err();

        assert!(!err.is_page_out_of_range());
        assert_eq!(daemon.calls(), vec![Call::List(2, 10)]);
    }

    #[test]
    fn empty_page_at_nonzero_index_reports_previous_page() {
        struct EmptyPages;
        impl TorrentService for EmptyPages {
            fn list(&self, page: usize, page_size: usize) -> RpcResult<TorrentListPage> {
                Ok(TorrentListPage {
                    page,
                    page_size,
                    torrents: Vec::new(),
                    torrents_total: 0,
                })
            }
            fn add(&self, _: &str, _: &str, _: AddSource) -> RpcResult<()> {
                unreachable!()
            }
            fn remove(&self, _: &Torrent, _: bool) -> RpcResult<()> {
                unreachable!()
            }
            fn move_storage(&self, _: &Torrent, _: &str) -> RpcResult<()> {
                unreachable!()
            }
            fn pause_or_resume(&self, _: &Torrent) -> RpcResult<PauseAction> {
                unreachable!()
            }
            fn properties(&self, _: &Torrent) -> RpcResult<TorrentProperties> {
                unreachable!()
            }
            fn set_properties(&self, _: &Torrent, _: &TorrentSettings) -> RpcResult<()> {
                unreachable!()
            }
        }

        let coordinator = PaginationCoordinator::new(10);
        let (_, page) = coordinator.request_page(&EmptyPages, 3).unwrap();
        assert_eq!(page, 2);
        let (_, page) = coordinator.request_page(&EmptyPages, 0).unwrap();
        assert_eq!(page, 0);
    }

    #[test]
    fn resolved_page_always_exists() {
        for total in [0, 1, 9, 10, 11, 25, 40] {
            let daemon = FakeDaemon::with_torrents(total);
            let coordinator = PaginationCoordinator::new(10);
            let pages = page_count(total, 10).max(1);
            for target in 0..6 {
                let (_, page) = coordinator.request_page(&daemon, target).unwrap();
                assert!(page < pages, "total {total} target {target} -> {page}");
            }
        }
    }

    #[test]
    fn resize_only_changes_the_next_request() {
        let daemon = FakeDaemon::with_torrents(25);
        let mut coordinator = PaginationCoordinator::new(10);
        coordinator.set_page_size(0);
        assert_eq!(coordinator.page_size(), 10);
        coordinator.set_page_size(5);
        assert!(daemon.calls().is_empty());
        coordinator.request_page(&daemon, 0).unwrap();
        assert_eq!(daemon.calls(), vec![Call::List(0, 5)]);
    }
}
