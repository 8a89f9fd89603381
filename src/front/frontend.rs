//! Tribbler service front-end over bin storage.

use std::collections::HashSet;
use std::sync::Arc;

use crate::binstore::BinStorage;
use crate::front::trib::{
    is_valid_username, Trib, MAX_FOLLOWING, MAX_TRIB_FETCH, MAX_TRIB_LEN,
    MIN_LIST_USER,
};
use crate::storage::{KeyList, KeyString, KeyValue, Pattern, Storage};
use crate::utils::TribError;

use async_trait::async_trait;

use tokio::sync::{mpsc, Mutex};

/// Name of the bin holding one key per registered user.
pub const USER_BIN: &str = "_USERLIST_";

/// List of a user's serialized tribs inside the user's own bin.
const POSTS_KEY: &str = "posts";

/// List of a user's followees inside the user's own bin.
const FOLLOWS_KEY: &str = "follows";

/// Value marking a registered user in the user bin.
const USER_PRESENT: &str = "true";

/// Tribbler service interface.
#[async_trait]
pub trait Server: Send + Sync {
    /// Registers a new user.
    async fn sign_up(&self, user: &str) -> Result<(), TribError>;

    /// Lists a sorted snapshot of at least `min_list_user` registered users,
    /// or all of them if there are fewer.
    async fn list_users(&self) -> Result<Vec<String>, TribError>;

    /// Posts `post` as `who`. `clock` is the largest clock value the caller
    /// has observed so far.
    async fn post(
        &self,
        who: &str,
        post: &str,
        clock: u64,
    ) -> Result<(), TribError>;

    /// Lists the most recent tribs posted by `user`, oldest first.
    async fn tribs(&self, user: &str) -> Result<Vec<Trib>, TribError>;

    /// Makes `who` follow `whom`.
    async fn follow(&self, who: &str, whom: &str) -> Result<(), TribError>;

    /// Makes `who` stop following `whom`.
    async fn unfollow(&self, who: &str, whom: &str) -> Result<(), TribError>;

    /// Returns whether `who` follows `whom`.
    async fn is_following(
        &self,
        who: &str,
        whom: &str,
    ) -> Result<bool, TribError>;

    /// Lists the users `who` follows.
    async fn following(&self, who: &str) -> Result<Vec<String>, TribError>;

    /// Lists the most recent tribs of `user` and everyone `user` follows,
    /// oldest first.
    async fn home(&self, user: &str) -> Result<Vec<Trib>, TribError>;
}

/// Front-end limits.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontConfig {
    /// Maximum trib length in bytes.
    pub max_trib_len: usize,

    /// Retention cap per user, and cap on tribs returned by one fetch.
    pub max_trib_fetch: usize,

    /// User list snapshot size at which the snapshot stops refreshing.
    pub min_list_user: usize,

    /// Maximum number of followees per user.
    pub max_following: usize,
}

impl Default for FrontConfig {
    fn default() -> Self {
        FrontConfig {
            max_trib_len: MAX_TRIB_LEN,
            max_trib_fetch: MAX_TRIB_FETCH,
            min_list_user: MIN_LIST_USER,
            max_following: MAX_FOLLOWING,
        }
    }
}

impl FrontConfig {
    /// Parses a config from an optional TOML string, starting from the
    /// default limits.
    pub fn from_toml(config_str: Option<&str>) -> Result<Self, TribError> {
        parsed_config!(config_str => FrontConfig;
                       max_trib_len, max_trib_fetch,
                       min_list_user, max_following)
    }
}

/// Creates a front-end with default limits over bin storage `bins`.
pub fn new_front(bins: Arc<dyn BinStorage>) -> Arc<dyn Server> {
    Arc::new(Front::new(bins, FrontConfig::default()))
}

/// Tribbler front-end. Stateless apart from the cached user list; every
/// fact lives in bin storage.
pub struct Front {
    /// Bin storage holding all users' data.
    bins: Arc<dyn BinStorage>,

    /// Cached user list snapshot.
    users: Mutex<Vec<String>>,

    /// Limits in effect.
    config: FrontConfig,
}

impl Front {
    /// Creates a front-end over `bins` with the given limits.
    pub fn new(bins: Arc<dyn BinStorage>, config: FrontConfig) -> Self {
        Front {
            bins,
            users: Mutex::new(vec![]),
            config,
        }
    }

    /// Limits in effect.
    pub fn config(&self) -> &FrontConfig {
        &self.config
    }

    async fn has_user(
        bins: &dyn BinStorage,
        user: &str,
    ) -> Result<bool, TribError> {
        let user_bin = bins.bin(USER_BIN).await?;
        Ok(user_bin.get(user).await?.as_deref() == Some(USER_PRESENT))
    }

    async fn check_user(
        bins: &dyn BinStorage,
        user: &str,
    ) -> Result<(), TribError> {
        if Self::has_user(bins, user).await? {
            Ok(())
        } else {
            Err(TribError::UserNotFound(user.into()))
        }
    }

    /// Loads every parsable trib of a user's bin along with its stored
    /// string. Entries that fail to parse are skipped.
    async fn load_posts(
        bin: &dyn Storage,
    ) -> Result<Vec<(String, Trib)>, TribError> {
        let posts = bin.list_get(POSTS_KEY).await?;
        Ok(posts
            .into_iter()
            .filter_map(|raw| match serde_json::from_str::<Trib>(&raw) {
                Ok(trib) => Some((raw, trib)),
                Err(e) => {
                    pf_warn!("skipping malformed trib {:?}: {}", raw, e);
                    None
                }
            })
            .collect())
    }

    /// Fetches the `max_fetch` most recent tribs of `user`, oldest first.
    /// Takes owned handles so it can run inside spawned fan-out tasks.
    async fn user_tribs(
        bins: Arc<dyn BinStorage>,
        user: String,
        max_fetch: usize,
    ) -> Result<Vec<Trib>, TribError> {
        Self::check_user(bins.as_ref(), &user).await?;
        let bin = bins.bin(&user).await?;
        let mut tribs: Vec<Trib> = Self::load_posts(bin.as_ref())
            .await?
            .into_iter()
            .map(|(_, trib)| trib)
            .collect();
        tribs.sort();
        Ok(keep_latest(tribs, max_fetch))
    }

    /// Removes the oldest tribs of a user beyond the retention cap, touching
    /// the bin clock once per removal. Failures of single removals are
    /// logged and do not stop the pass.
    async fn evict_posts(&self, bin: &dyn Storage) -> Result<(), TribError> {
        let mut posts = Self::load_posts(bin).await?;
        if posts.len() <= self.config.max_trib_fetch {
            return Ok(());
        }
        posts.sort_by(|a, b| a.1.cmp(&b.1));

        let excess = posts.len() - self.config.max_trib_fetch;
        for (raw, _) in posts.into_iter().take(excess) {
            if let Err(e) = bin.list_remove(&KeyValue::new(POSTS_KEY, raw)).await
            {
                pf_warn!("error evicting trib: {}", e);
            }
            if let Err(e) = bin.clock(0).await {
                pf_warn!("error touching clock after eviction: {}", e);
            }
        }
        Ok(())
    }

    /// Common checks of follow-related operations: both users exist and are
    /// distinct.
    async fn check_pair(&self, who: &str, whom: &str) -> Result<(), TribError> {
        Self::check_user(self.bins.as_ref(), who).await?;
        Self::check_user(self.bins.as_ref(), whom).await?;
        if who == whom {
            return Err(TribError::WhoWhom(who.into()));
        }
        Ok(())
    }
}

/// Keeps the last `n` elements of sorted `tribs`.
fn keep_latest(mut tribs: Vec<Trib>, n: usize) -> Vec<Trib> {
    if tribs.len() > n {
        tribs.drain(..tribs.len() - n);
    }
    tribs
}

#[async_trait]
impl Server for Front {
    async fn sign_up(&self, user: &str) -> Result<(), TribError> {
        if !is_valid_username(user) {
            return Err(TribError::InvalidUsername(user.into()));
        }
        if Self::has_user(self.bins.as_ref(), user).await? {
            return Err(TribError::UsernameTaken(user.into()));
        }

        let user_bin = self.bins.bin(USER_BIN).await?;
        if !user_bin.set(&KeyValue::new(user, USER_PRESENT)).await? {
            return logged_err!("error registering user {:?}", user);
        }
        user_bin.clock(0).await?;
        pf_debug!("signed up user {:?}", user);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<String>, TribError> {
        let mut users = self.users.lock().await;
        if users.len() >= self.config.min_list_user {
            return Ok(users.clone());
        }

        let user_bin = self.bins.bin(USER_BIN).await?;
        let mut fetched = user_bin.keys(&Pattern::default()).await?;
        fetched.sort();
        fetched.truncate(self.config.min_list_user);
        *users = fetched.clone();
        Ok(fetched)
    }

    async fn post(
        &self,
        who: &str,
        post: &str,
        clock: u64,
    ) -> Result<(), TribError> {
        Self::check_user(self.bins.as_ref(), who).await?;
        if post.is_empty() {
            return Err(TribError::EmptyPost);
        }
        if post.len() > self.config.max_trib_len {
            return Err(TribError::TribTooLong);
        }

        let bin = self.bins.bin(who).await?;
        let stamp = bin.clock(clock).await?;
        let trib = Trib::new(who, post, stamp);
        let raw = serde_json::to_string(&trib)?;
        if !bin.list_append(&KeyValue::new(POSTS_KEY, raw)).await? {
            return logged_err!("error appending trib of {:?}", who);
        }

        if let Err(e) = self.evict_posts(bin.as_ref()).await {
            pf_warn!("error evicting old tribs of {:?}: {}", who, e);
        }
        Ok(())
    }

    async fn tribs(&self, user: &str) -> Result<Vec<Trib>, TribError> {
        Self::user_tribs(
            self.bins.clone(),
            user.to_string(),
            self.config.max_trib_fetch,
        )
        .await
    }

    async fn follow(&self, who: &str, whom: &str) -> Result<(), TribError> {
        self.check_pair(who, whom).await?;

        let followees = self.following(who).await?;
        if followees.iter().any(|f| f == whom) {
            return Err(TribError::AlreadyFollowing(who.into(), whom.into()));
        }
        if followees.len() >= self.config.max_following {
            return Err(TribError::FollowingTooMany);
        }

        let bin = self.bins.bin(who).await?;
        if !bin.list_append(&KeyValue::new(FOLLOWS_KEY, whom)).await? {
            return logged_err!("error appending followee of {:?}", who);
        }
        bin.clock(0).await?;
        Ok(())
    }

    async fn unfollow(&self, who: &str, whom: &str) -> Result<(), TribError> {
        if !self.is_following(who, whom).await? {
            return Err(TribError::NotFollowing(who.into(), whom.into()));
        }

        let bin = self.bins.bin(who).await?;
        bin.list_remove(&KeyValue::new(FOLLOWS_KEY, whom)).await?;
        bin.clock(0).await?;
        Ok(())
    }

    async fn is_following(
        &self,
        who: &str,
        whom: &str,
    ) -> Result<bool, TribError> {
        self.check_pair(who, whom).await?;
        let followees = self.following(who).await?;
        Ok(followees.iter().any(|f| f == whom))
    }

    async fn following(&self, who: &str) -> Result<Vec<String>, TribError> {
        Self::check_user(self.bins.as_ref(), who).await?;
        let bin = self.bins.bin(who).await?;
        let mut seen = HashSet::new();
        Ok(bin
            .list_get(FOLLOWS_KEY)
            .await?
            .into_iter()
            .filter(|f| seen.insert(f.clone()))
            .collect())
    }

    async fn home(&self, user: &str) -> Result<Vec<Trib>, TribError> {
        let mut members = self.following(user).await?;
        members.push(user.to_string());

        // fetch every member's tribs in parallel
        let (tx_tribs, mut rx_tribs) = mpsc::unbounded_channel();
        for member in members.iter() {
            let bins = self.bins.clone();
            let member = member.clone();
            let max_fetch = self.config.max_trib_fetch;
            let tx_tribs = tx_tribs.clone();
            tokio::spawn(async move {
                let result =
                    Self::user_tribs(bins, member.clone(), max_fetch).await;
                if let Err(e) = tx_tribs.send((member, result)) {
                    pf_error!("error sending to tribs channel: {}", e);
                }
            });
        }
        drop(tx_tribs);

        let mut tribs = vec![];
        for _ in 0..members.len() {
            match rx_tribs.recv().await {
                Some((_, Ok(member_tribs))) => tribs.extend(member_tribs),
                Some((member, Err(e))) => {
                    pf_warn!("skipping tribs of {:?} in home: {}", member, e);
                }
                None => break,
            }
        }

        tribs.sort();
        Ok(keep_latest(tribs, self.config.max_trib_fetch))
    }
}

#[cfg(test)]
mod frontend_tests {
    use super::*;
    use crate::binstore::{new_bin_client, BinClient};
    use crate::rpc::{serve_back, BackConfig};
    use crate::storage::MemStorage;

    fn mem_bins(n: usize) -> Arc<dyn BinStorage> {
        Arc::new(BinClient::with_backends(
            (0..n)
                .map(|_| Arc::new(MemStorage::new()) as Arc<dyn Storage>)
                .collect(),
        ))
    }

    fn front_with(config: FrontConfig) -> Front {
        Front::new(mem_bins(3), config)
    }

    /// Number of clock calls `back` served since the value `last` was read.
    /// Reading advances the clock by one on its own.
    async fn calls_since(
        back: &MemStorage,
        last: &mut u64,
    ) -> Result<u64, TribError> {
        let now = back.clock(0).await?;
        let calls = now - *last - 1;
        *last = now;
        Ok(calls)
    }

    /// Bin storage whose bin `broken` fails every `list_get`.
    struct FailingListBins {
        inner: Arc<dyn BinStorage>,
        broken: String,
    }

    #[async_trait]
    impl BinStorage for FailingListBins {
        async fn bin(&self, name: &str) -> Result<Arc<dyn Storage>, TribError> {
            let bin = self.inner.bin(name).await?;
            if name == self.broken {
                let failing: Arc<dyn Storage> =
                    Arc::new(FailingLists { inner: bin });
                Ok(failing)
            } else {
                Ok(bin)
            }
        }
    }

    struct FailingLists {
        inner: Arc<dyn Storage>,
    }

    #[async_trait]
    impl KeyString for FailingLists {
        async fn get(&self, key: &str) -> Result<Option<String>, TribError> {
            self.inner.get(key).await
        }

        async fn set(&self, kv: &KeyValue) -> Result<bool, TribError> {
            self.inner.set(kv).await
        }

        async fn keys(&self, p: &Pattern) -> Result<Vec<String>, TribError> {
            self.inner.keys(p).await
        }
    }

    #[async_trait]
    impl KeyList for FailingLists {
        async fn list_get(&self, key: &str) -> Result<Vec<String>, TribError> {
            Err(TribError::msg(format!("list {:?} unreachable", key)))
        }

        async fn list_append(&self, kv: &KeyValue) -> Result<bool, TribError> {
            self.inner.list_append(kv).await
        }

        async fn list_remove(&self, kv: &KeyValue) -> Result<u32, TribError> {
            self.inner.list_remove(kv).await
        }

        async fn list_keys(
            &self,
            p: &Pattern,
        ) -> Result<Vec<String>, TribError> {
            self.inner.list_keys(p).await
        }
    }

    #[async_trait]
    impl Storage for FailingLists {
        async fn clock(&self, at_least: u64) -> Result<u64, TribError> {
            self.inner.clock(at_least).await
        }
    }

    #[test]
    fn config_defaults() -> Result<(), TribError> {
        let config = FrontConfig::from_toml(None)?;
        assert_eq!(config, FrontConfig::default());
        assert_eq!(config.max_trib_len, 140);
        assert_eq!(config.max_trib_fetch, 100);
        assert_eq!(config.min_list_user, 20);
        assert_eq!(config.max_following, 2000);
        Ok(())
    }

    #[test]
    fn config_from_toml() -> Result<(), TribError> {
        let config = FrontConfig::from_toml(Some(
            "max_trib_fetch = 5\nmax_following = 3",
        ))?;
        assert_eq!(config.max_trib_fetch, 5);
        assert_eq!(config.max_following, 3);
        assert_eq!(config.max_trib_len, MAX_TRIB_LEN);
        assert!(FrontConfig::from_toml(Some("max_tribs = 5")).is_err());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sign_up_rules() -> Result<(), TribError> {
        let front = front_with(FrontConfig::default());
        front.sign_up("alice").await?;
        assert!(matches!(
            front.sign_up("alice").await,
            Err(TribError::UsernameTaken(_))
        ));
        assert!(matches!(
            front.sign_up("Alice").await,
            Err(TribError::InvalidUsername(_))
        ));
        assert!(matches!(
            front.sign_up("").await,
            Err(TribError::InvalidUsername(_))
        ));
        assert_eq!(front.list_users().await?, vec!["alice"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn list_users_snapshot() -> Result<(), TribError> {
        let front = front_with(FrontConfig {
            min_list_user: 3,
            ..Default::default()
        });
        for user in ["dave", "carol", "bob"] {
            front.sign_up(user).await?;
        }
        assert_eq!(front.list_users().await?, vec!["bob", "carol", "dave"]);

        // snapshot has reached the cap and stays put
        front.sign_up("alice").await?;
        assert_eq!(front.list_users().await?, vec!["bob", "carol", "dave"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn list_users_refreshes_below_cap() -> Result<(), TribError> {
        let front = front_with(FrontConfig {
            min_list_user: 3,
            ..Default::default()
        });
        front.sign_up("zed").await?;
        assert_eq!(front.list_users().await?, vec!["zed"]);
        front.sign_up("amy").await?;
        assert_eq!(front.list_users().await?, vec!["amy", "zed"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn post_rules() -> Result<(), TribError> {
        let front = front_with(FrontConfig::default());
        front.sign_up("alice").await?;
        assert!(matches!(
            front.post("carol", "hi", 0).await,
            Err(TribError::UserNotFound(_))
        ));
        assert!(matches!(
            front.post("alice", "", 0).await,
            Err(TribError::EmptyPost)
        ));
        assert!(matches!(
            front.post("alice", &"x".repeat(141), 0).await,
            Err(TribError::TribTooLong)
        ));
        front.post("alice", &"x".repeat(140), 0).await?;
        assert_eq!(front.tribs("alice").await?.len(), 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn post_respects_clock_hint() -> Result<(), TribError> {
        let front = front_with(FrontConfig::default());
        front.sign_up("alice").await?;
        front.post("alice", "first", 0).await?;
        front.post("alice", "second", 500).await?;
        front.post("alice", "third", 0).await?;

        let tribs = front.tribs("alice").await?;
        let messages: Vec<&str> =
            tribs.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert!(tribs[1].clock >= 500);
        assert!(tribs[2].clock > tribs[1].clock);
        assert!(tribs.iter().all(|t| t.user == "alice"));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn retention_cap() -> Result<(), TribError> {
        let bins = mem_bins(2);
        let front = Front::new(
            bins.clone(),
            FrontConfig {
                max_trib_fetch: 5,
                ..Default::default()
            },
        );
        front.sign_up("alice").await?;
        for i in 0..12 {
            front.post("alice", &format!("post {}", i), 0).await?;
        }

        let tribs = front.tribs("alice").await?;
        let messages: Vec<String> =
            tribs.iter().map(|t| t.message.clone()).collect();
        assert_eq!(
            messages,
            vec!["post 7", "post 8", "post 9", "post 10", "post 11"]
        );

        // storage itself never holds more than the cap
        let bin = bins.bin("alice").await?;
        assert_eq!(bin.list_get(POSTS_KEY).await?.len(), 5);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn clock_touches() -> Result<(), TribError> {
        // one backend, so every bin shares the clock read here
        let back = Arc::new(MemStorage::new());
        let bins: Arc<dyn BinStorage> = Arc::new(BinClient::with_backends(
            vec![back.clone() as Arc<dyn Storage>],
        ));
        let front = Front::new(
            bins,
            FrontConfig {
                max_trib_fetch: 2,
                ..Default::default()
            },
        );

        let mut last = back.clock(0).await?;
        front.sign_up("alice").await?;
        assert_eq!(calls_since(&back, &mut last).await?, 1);
        front.sign_up("bob").await?;
        assert_eq!(calls_since(&back, &mut last).await?, 1);
        front.follow("alice", "bob").await?;
        assert_eq!(calls_since(&back, &mut last).await?, 1);
        assert!(front.follow("alice", "bob").await.is_err());
        assert_eq!(calls_since(&back, &mut last).await?, 0);
        front.unfollow("alice", "bob").await?;
        assert_eq!(calls_since(&back, &mut last).await?, 1);

        // one stamp per post, plus one touch per evicted trib
        front.post("alice", "one", 0).await?;
        assert_eq!(calls_since(&back, &mut last).await?, 1);
        front.post("alice", "two", 0).await?;
        assert_eq!(calls_since(&back, &mut last).await?, 1);
        front.post("alice", "three", 0).await?;
        assert_eq!(calls_since(&back, &mut last).await?, 2);

        let bin = front.bins.bin("alice").await?;
        assert_eq!(bin.list_get(POSTS_KEY).await?.len(), 2);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn malformed_tribs_skipped() -> Result<(), TribError> {
        let bins = mem_bins(1);
        let front = Front::new(bins.clone(), FrontConfig::default());
        front.sign_up("alice").await?;
        front.post("alice", "hello", 0).await?;
        let bin = bins.bin("alice").await?;
        bin.list_append(&KeyValue::new(POSTS_KEY, "not json")).await?;

        let tribs = front.tribs("alice").await?;
        assert_eq!(tribs.len(), 1);
        assert_eq!(tribs[0].message, "hello");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn follow_round_trip() -> Result<(), TribError> {
        let front = front_with(FrontConfig::default());
        front.sign_up("alice").await?;
        front.sign_up("bob").await?;

        assert!(!front.is_following("bob", "alice").await?);
        front.follow("bob", "alice").await?;
        assert!(front.is_following("bob", "alice").await?);
        assert!(!front.is_following("alice", "bob").await?);
        assert!(matches!(
            front.follow("bob", "alice").await,
            Err(TribError::AlreadyFollowing(_, _))
        ));
        assert_eq!(front.following("bob").await?, vec!["alice"]);

        front.unfollow("bob", "alice").await?;
        assert!(!front.is_following("bob", "alice").await?);
        assert!(front.following("bob").await?.is_empty());
        assert!(matches!(
            front.unfollow("bob", "alice").await,
            Err(TribError::NotFollowing(_, _))
        ));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn follow_rules() -> Result<(), TribError> {
        let front = front_with(FrontConfig::default());
        front.sign_up("alice").await?;
        assert!(matches!(
            front.follow("alice", "alice").await,
            Err(TribError::WhoWhom(_))
        ));
        assert!(matches!(
            front.is_following("alice", "alice").await,
            Err(TribError::WhoWhom(_))
        ));
        assert!(matches!(
            front.follow("alice", "carol").await,
            Err(TribError::UserNotFound(_))
        ));
        assert!(matches!(
            front.follow("carol", "alice").await,
            Err(TribError::UserNotFound(_))
        ));
        assert!(matches!(
            front.following("carol").await,
            Err(TribError::UserNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn follow_limit() -> Result<(), TribError> {
        let front = front_with(FrontConfig {
            max_following: 2,
            ..Default::default()
        });
        for user in ["alice", "bob", "carol", "dave"] {
            front.sign_up(user).await?;
        }
        front.follow("alice", "bob").await?;
        front.follow("alice", "carol").await?;
        assert!(matches!(
            front.follow("alice", "dave").await,
            Err(TribError::FollowingTooMany)
        ));
        assert_eq!(front.following("alice").await?.len(), 2);

        front.unfollow("alice", "bob").await?;
        front.follow("alice", "dave").await?;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn following_deduplicates() -> Result<(), TribError> {
        let bins = mem_bins(1);
        let front = Front::new(bins.clone(), FrontConfig::default());
        front.sign_up("alice").await?;
        front.sign_up("bob").await?;
        let bin = bins.bin("alice").await?;
        bin.list_append(&KeyValue::new(FOLLOWS_KEY, "bob")).await?;
        bin.list_append(&KeyValue::new(FOLLOWS_KEY, "bob")).await?;

        assert_eq!(front.following("alice").await?, vec!["bob"]);
        front.unfollow("alice", "bob").await?;
        assert!(!front.is_following("alice", "bob").await?);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn home_timeline() -> Result<(), TribError> {
        let front = front_with(FrontConfig::default());
        front.sign_up("alice").await?;
        front.sign_up("bob").await?;
        front.post("alice", "hello", 0).await?;
        front.post("alice", "world", 0).await?;
        front.follow("bob", "alice").await?;

        let home = front.home("bob").await?;
        let messages: Vec<&str> =
            home.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["hello", "world"]);

        // own tribs show up too, after the clock moved past alice's
        let clock = home.iter().map(|t| t.clock).max().map_or(0, |c| c + 1);
        front.post("bob", "hi alice", clock).await?;
        let home = front.home("bob").await?;
        assert_eq!(home.len(), 3);
        assert_eq!(home[2].message, "hi alice");
        assert_eq!(front.home("alice").await?.len(), 2);

        for result in [
            front.home("carol").await.err(),
            front.tribs("carol").await.err(),
            front.post("carol", "hi", 0).await.err(),
            front.follow("carol", "alice").await.err(),
            front.unfollow("carol", "alice").await.err(),
            front.is_following("carol", "alice").await.err(),
        ] {
            assert!(matches!(result, Some(TribError::UserNotFound(_))));
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn home_caps_merged_tribs() -> Result<(), TribError> {
        let front = front_with(FrontConfig {
            max_trib_fetch: 4,
            ..Default::default()
        });
        for user in ["alice", "bob", "carol"] {
            front.sign_up(user).await?;
        }
        front.follow("carol", "alice").await?;
        front.follow("carol", "bob").await?;
        let mut clock = 0;
        for i in 0..3 {
            for user in ["alice", "bob"] {
                front.post(user, &format!("{} {}", user, i), clock).await?;
                clock = front
                    .tribs(user)
                    .await?
                    .last()
                    .map_or(clock, |t| t.clock + 1);
            }
        }

        let home = front.home("carol").await?;
        let messages: Vec<&str> =
            home.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["alice 1", "bob 1", "alice 2", "bob 2"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn home_skips_failed_followee() -> Result<(), TribError> {
        let bins = mem_bins(2);
        let front = Front::new(bins.clone(), FrontConfig::default());
        for user in ["alice", "bob", "carol"] {
            front.sign_up(user).await?;
        }
        front.follow("carol", "alice").await?;
        front.follow("carol", "bob").await?;
        front.post("alice", "from alice", 0).await?;
        front.post("bob", "from bob", 0).await?;
        front.post("carol", "from carol", 0).await?;
        assert_eq!(front.home("carol").await?.len(), 3);

        let degraded = Front::new(
            Arc::new(FailingListBins {
                inner: bins,
                broken: "bob".into(),
            }),
            FrontConfig::default(),
        );
        assert!(degraded.tribs("bob").await.is_err());
        let home = degraded.home("carol").await?;
        let mut messages: Vec<&str> =
            home.iter().map(|t| t.message.as_str()).collect();
        messages.sort_unstable();
        assert_eq!(messages, vec!["from alice", "from carol"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn front_over_rpc() -> Result<(), TribError> {
        let addrs: Vec<String> = (0..3)
            .map(|i| format!("127.0.0.1:{}", 33200 + i))
            .collect();
        for addr in addrs.iter() {
            let (tx_ready, mut rx_ready) = mpsc::channel(1);
            tokio::spawn(serve_back(BackConfig {
                addr: addr.clone(),
                store: Arc::new(MemStorage::new()),
                ready: Some(tx_ready),
                shutdown: None,
            }));
            assert_eq!(rx_ready.recv().await, Some(true));
        }

        let front = new_front(new_bin_client(addrs));
        front.sign_up("alice").await?;
        front.sign_up("bob").await?;
        front.post("alice", "hello", 0).await?;
        front.post("alice", "world", 0).await?;
        front.follow("bob", "alice").await?;

        let home = front.home("bob").await?;
        let messages: Vec<&str> =
            home.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(messages, vec!["hello", "world"]);
        assert!(matches!(
            front.tribs("carol").await,
            Err(TribError::UserNotFound(_))
        ));
        Ok(())
    }
}
