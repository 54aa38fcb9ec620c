//! 🎯 resolver.rs: many tarballs enter, one tarball leaves.
//!
//! 🎬 COLD OPEN. INT. BUCKET. 3:47 AM
//!
//! A revision build was retried. Then retried again. Now there are three tarballs
//! under the same job path, in `build-12/`, `build-15/` and `build-13/`, plus a
//! changelog, a `.deb`, and a tarball for a package nobody asked for. The downstream
//! job wants exactly one file. It wants the newest one. It wants it now.
//!
//! 🧠 Knowledge graph:
//! - `filter_keys`: stream transform, keeps keys ending in the package suffix and pairs
//!   each with its file name.
//! - `package_candidates`: `filter_keys` plus the `juju-core_` file name check. Both
//!   must hold. Neither implies the other.
//! - `select_latest_build`: highest `build-<n>/` wins. Empty → `PackageNotFound`.
//!   A candidate without the segment → `DataIntegrity`, never a silent skip.
//! - `find_package_key`: list → filter → select, for one revision build.
//! - The listing is consumed lazily. Only survivors of both filters get collected.

use std::sync::LazyLock;

use futures::{Stream, TryStreamExt, future};
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::backends::{ObjectKey, ObjectStore};
use crate::error::{ResolveError, Result};
use crate::naming::Naming;

/// 📦 Every eligible package file name starts with this.
pub const PACKAGE_PREFIX: &str = "juju-core_";

// -- 🔍 compiled once, matched many times
static BUILD_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    // -- 🐛 safe expect: the pattern is a literal and it compiles, I checked, twice
    // -- 🔢 [0-9], not \d: regex's \d is Unicode-aware and would happily eat '٣'
    Regex::new(r"build-([0-9]+)/").expect("build segment pattern is a valid regex")
});

/// 🎟️ A key that passed filtering, with the file name it will have on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: ObjectKey,
    pub file_name: String,
}

impl Candidate {
    pub fn from_key(key: ObjectKey) -> Self {
        let file_name = key.file_name().to_string();
        Self { key, file_name }
    }
}

/// 🔢 The `<n>` in the first `build-<n>/` of a key name.
///
/// None when the segment is missing, or when `<n>` is too big for a u64
/// (in which case someone has been running CI for a very, very long time).
pub fn embedded_build_number(name: &str) -> Option<u64> {
    BUILD_SEGMENT
        .captures(name)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// 🚰 Keep keys whose name ends with `suffix`, paired with their file name.
///
/// Lazy: one key in, zero or one candidate out. Listing errors pass through untouched.
pub fn filter_keys<'a, S>(keys: S, suffix: &'a str) -> impl Stream<Item = Result<Candidate>> + 'a
where
    S: Stream<Item = Result<ObjectKey>> + 'a,
{
    keys.try_filter_map(move |key| {
        let the_candidate = if key.name.ends_with(suffix) {
            Some(Candidate::from_key(key))
        } else {
            trace!("🚫 {} does not end with {}", key.name, suffix);
            None
        };
        future::ready(Ok(the_candidate))
    })
}

/// 🎟️ `filter_keys`, then only file names starting with [`PACKAGE_PREFIX`].
pub fn package_candidates<'a, S>(
    keys: S,
    suffix: &'a str,
) -> impl Stream<Item = Result<Candidate>> + 'a
where
    S: Stream<Item = Result<ObjectKey>> + 'a,
{
    filter_keys(keys, suffix).try_filter(|candidate| {
        let is_package = candidate.file_name.starts_with(PACKAGE_PREFIX);
        if !is_package {
            trace!("🚫 {} is not a {} package", candidate.key.name, PACKAGE_PREFIX);
        }
        future::ready(is_package)
    })
}

/// 🏆 Pick the candidate with the highest embedded build number.
///
/// - Empty input: `PackageNotFound`, checked before anything gets parsed.
/// - Any candidate without `build-<n>/`: `DataIntegrity` for that key. Whole call fails.
/// - Ties on the max: stable sort, so the one listed last wins. Logged at WARN because
///   it should not happen.
pub fn select_latest_build(candidates: Vec<Candidate>, job_path: &str) -> Result<Candidate> {
    if candidates.is_empty() {
        return Err(ResolveError::PackageNotFound {
            job_path: job_path.to_string(),
        });
    }

    let mut the_numbered = candidates
        .into_iter()
        .map(|candidate| match embedded_build_number(&candidate.key.name) {
            Some(build) => Ok((build, candidate)),
            None => Err(ResolveError::DataIntegrity {
                key: candidate.key.name.clone(),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    // -- 📐 sort_by_key is stable. equal builds keep listing order.
    the_numbered.sort_by_key(|(build, _)| *build);

    let (the_latest_build, the_winner) =
        the_numbered
            .pop()
            .ok_or_else(|| ResolveError::PackageNotFound {
                job_path: job_path.to_string(),
            })?;

    if let Some((_, runner_up)) = the_numbered
        .last()
        .filter(|(build, _)| *build == the_latest_build)
    {
        warn!(
            "⚠️ build-{} appears more than once under {}: picked {} over {}",
            the_latest_build, job_path, the_winner.key.name, runner_up.key.name
        );
    }

    debug!(
        "🏆 build-{} wins out of {} candidates",
        the_latest_build,
        the_numbered.len() + 1
    );
    Ok(the_winner)
}

/// 🔎 List, filter and select the package key for one revision build. Downloads nothing.
pub async fn find_package_key<S>(store: &S, naming: &Naming, revision_build: u64) -> Result<Candidate>
where
    S: ObjectStore + ?Sized,
{
    let the_job_path = naming.job_path(revision_build);
    let the_suffix = naming.package.release_package_suffix();
    debug!(
        "🔎 Looking under {} for *{} starting with {}",
        the_job_path, the_suffix, PACKAGE_PREFIX
    );

    let the_candidates: Vec<Candidate> =
        package_candidates(store.list(&the_job_path), &the_suffix)
            .try_collect()
            .await?;

    select_latest_build(the_candidates, &the_job_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryBucket;
    use crate::naming::NamingConfig;
    use futures::stream::{self, BoxStream};
    use futures::{FutureExt, StreamExt};

    const THE_JOB_PATH: &str = "juju-ci/products/version-4242/build-binary-trusty-amd64";
    const THE_SUFFIX: &str = "-trusty-amd64.tgz";

    fn trusty_amd64() -> Naming {
        Naming::new(
            "juju-ci",
            &NamingConfig {
                series: "trusty".to_string(),
                arch: "amd64".to_string(),
            },
        )
    }

    fn key_under_build(build: u64, file_name: &str) -> String {
        format!("{THE_JOB_PATH}/build-{build}/{file_name}")
    }

    fn candidate(name: &str) -> Candidate {
        Candidate::from_key(ObjectKey::new(name))
    }

    fn keys(names: &[&str]) -> BoxStream<'static, Result<ObjectKey>> {
        let the_keys: Vec<Result<ObjectKey>> =
            names.iter().map(|name| Ok(ObjectKey::new(*name))).collect();
        stream::iter(the_keys).boxed()
    }

    #[test]
    fn the_one_where_build_numbers_are_dug_out_of_the_path() {
        assert_eq!(
            embedded_build_number("a/build-15/juju-core_1.2.3-trusty-amd64.tgz"),
            Some(15)
        );
        assert_eq!(embedded_build_number("a/build-007/x.tgz"), Some(7));
        assert_eq!(embedded_build_number("a/juju-core_1.2.3-trusty-amd64.tgz"), None);
        // -- 🧵 no trailing slash, no build. the segment has to be a directory.
        assert_eq!(embedded_build_number("a/build-15"), None);
        assert_eq!(
            embedded_build_number("a/build-99999999999999999999999/x.tgz"),
            None
        );
    }

    #[test]
    fn the_one_where_only_ascii_digits_count_as_a_build() {
        assert_eq!(
            embedded_build_number("p/build-\u{663}/build-5/juju-core_1.2.3-trusty-amd64.tgz"),
            Some(5)
        );
        assert_eq!(embedded_build_number("p/build-\u{663}/juju-core_1.2.3-trusty-amd64.tgz"), None);
    }

    #[test]
    fn the_one_where_the_first_match_shows_up_before_the_listing_ends() {
        // -- ⏳ one good key, then a listing that never finishes
        let the_listing = stream::iter(vec![Ok(ObjectKey::new(
            "p/build-1/juju-core_1.2.3-trusty-amd64.tgz",
        ))])
        .chain(stream::pending::<Result<ObjectKey>>());
        let mut the_candidates = Box::pin(package_candidates(the_listing, THE_SUFFIX));

        let the_first = the_candidates
            .next()
            .now_or_never()
            .expect("💀 The first candidate should not wait for the rest of the listing.")
            .expect("💀 The stream ended early.")
            .expect("💀 No listing errors were injected.");
        assert_eq!(the_first.file_name, "juju-core_1.2.3-trusty-amd64.tgz");

        // -- 🕰️ and after that, it honestly waits
        assert!(the_candidates.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn the_one_where_the_suffix_filter_pairs_keys_with_file_names() {
        let the_candidates: Vec<Candidate> = filter_keys(
            keys(&[
                "p/build-1/juju-core_1.2.3-trusty-amd64.tgz",
                "p/build-1/juju-core_1.2.3-xenial-amd64.tgz",
                "p/build-1/other_1.2.3-trusty-amd64.tgz",
            ]),
            THE_SUFFIX,
        )
        .try_collect()
        .await
        .expect("💀 No listing errors were injected.");

        assert_eq!(
            the_candidates
                .iter()
                .map(|c| c.file_name.as_str())
                .collect::<Vec<_>>(),
            vec![
                "juju-core_1.2.3-trusty-amd64.tgz",
                "other_1.2.3-trusty-amd64.tgz"
            ]
        );
    }

    #[tokio::test]
    async fn the_one_where_the_package_prefix_is_not_optional() {
        let the_candidates: Vec<Candidate> = package_candidates(
            keys(&[
                "p/build-1/other_1.2.3-trusty-amd64.tgz",
                "p/build-2/juju-core_1.2.3-trusty-amd64.tgz",
            ]),
            THE_SUFFIX,
        )
        .try_collect()
        .await
        .expect("💀 No listing errors were injected.");

        assert_eq!(the_candidates.len(), 1);
        assert_eq!(the_candidates[0].file_name, "juju-core_1.2.3-trusty-amd64.tgz");
    }

    #[tokio::test]
    async fn the_one_where_the_suffix_is_not_optional_either() {
        let the_candidates: Vec<Candidate> = package_candidates(
            keys(&[
                "p/build-1/juju-core_1.2.3-trusty-amd64.deb",
                "p/build-2/juju-core_1.2.3-trusty-amd64.tgz.sig",
            ]),
            THE_SUFFIX,
        )
        .try_collect()
        .await
        .expect("💀 No listing errors were injected.");

        assert!(the_candidates.is_empty());
    }

    #[tokio::test]
    async fn the_one_where_listing_errors_pass_straight_through() {
        let the_listing = stream::iter(vec![
            Ok(ObjectKey::new("p/build-1/juju-core_1.2.3-trusty-amd64.tgz")),
            Err(ResolveError::transport("list", "p", "503 Slow Down")),
        ]);

        let the_result: Result<Vec<Candidate>> =
            package_candidates(the_listing, THE_SUFFIX).try_collect().await;
        assert!(matches!(the_result, Err(ResolveError::Transport { .. })));
    }

    #[test]
    fn the_one_where_the_highest_build_takes_the_crown() {
        let the_winner = select_latest_build(
            vec![
                candidate(&key_under_build(13, "juju-core_1.2.3-trusty-amd64.tgz")),
                candidate(&key_under_build(15, "juju-core_1.2.3-trusty-amd64.tgz")),
                candidate(&key_under_build(9, "juju-core_1.2.3-trusty-amd64.tgz")),
                candidate(&key_under_build(100, "juju-core_1.2.3-trusty-amd64.tgz")),
                candidate(&key_under_build(12, "juju-core_1.2.3-trusty-amd64.tgz")),
            ],
            THE_JOB_PATH,
        )
        .expect("💀 Five good candidates should produce a winner.");

        // -- 🔢 numeric, not lexicographic. "100" > "15" even though '1' == '1'.
        assert_eq!(
            the_winner.key.name,
            key_under_build(100, "juju-core_1.2.3-trusty-amd64.tgz")
        );
    }

    #[test]
    fn the_one_where_nothing_to_choose_means_package_not_found() {
        let the_error = select_latest_build(vec![], THE_JOB_PATH)
            .expect_err("💀 An empty set cannot have a winner.");
        assert!(the_error.is_package_not_found());
    }

    #[test]
    fn the_one_where_a_key_without_a_build_segment_is_a_data_integrity_problem() {
        let the_broken_name = format!("{THE_JOB_PATH}/juju-core_1.2.3-trusty-amd64.tgz");
        let the_error = select_latest_build(
            vec![
                candidate(&key_under_build(3, "juju-core_1.2.3-trusty-amd64.tgz")),
                candidate(&the_broken_name),
            ],
            THE_JOB_PATH,
        )
        .expect_err("💀 A key without build-<n>/ must fail the whole selection.");

        match the_error {
            ResolveError::DataIntegrity { key } => assert_eq!(key, the_broken_name),
            other => panic!("💀 Expected DataIntegrity, the selector gave us {other:?}"),
        }
    }

    #[test]
    fn the_one_where_a_tie_goes_to_whoever_was_listed_last() {
        let the_first = format!("{THE_JOB_PATH}/a/build-7/juju-core_1.2.3-trusty-amd64.tgz");
        let the_second = format!("{THE_JOB_PATH}/b/build-7/juju-core_1.2.3-trusty-amd64.tgz");

        let the_winner = select_latest_build(
            vec![candidate(&the_first), candidate(&the_second)],
            THE_JOB_PATH,
        )
        .expect("💀 A tie is still a winner.");
        assert_eq!(the_winner.key.name, the_second);
    }

    // ============================================================
    //  🎬 Scenarios, end to end through an in-memory bucket
    // ============================================================

    #[tokio::test]
    async fn the_one_where_build_15_beats_build_12() {
        let mut the_bucket = InMemoryBucket::new();
        the_bucket
            .insert(key_under_build(15, "juju-core_1.2.3-trusty-amd64.tgz"), b"15".to_vec())
            .insert(key_under_build(12, "juju-core_1.2.3-trusty-amd64.tgz"), b"12".to_vec())
            .insert(key_under_build(16, "juju-core_1.2.3-xenial-amd64.tgz"), b"wrong series".to_vec())
            .insert(key_under_build(17, "juju-core_1.2.3-trusty-amd64.deb"), b"wrong format".to_vec())
            .insert(key_under_build(18, "juju-ci-tools-trusty-amd64.tgz"), b"wrong package".to_vec());

        let the_winner = find_package_key(&the_bucket, &trusty_amd64(), 4242)
            .await
            .expect("💀 There is a build-15 right there.");
        assert_eq!(
            the_winner.key.name,
            key_under_build(15, "juju-core_1.2.3-trusty-amd64.tgz")
        );
        assert_eq!(the_winner.file_name, "juju-core_1.2.3-trusty-amd64.tgz");
    }

    #[tokio::test]
    async fn the_one_where_only_impostors_live_under_the_job_path() {
        let mut the_bucket = InMemoryBucket::new();
        the_bucket
            .insert(key_under_build(1, "juju-ci-tools-trusty-amd64.tgz"), b"no".to_vec())
            .insert(key_under_build(2, "juju-core-trusty-amd64.tgz"), b"close, no".to_vec());

        let the_error = find_package_key(&the_bucket, &trusty_amd64(), 4242)
            .await
            .expect_err("💀 No juju-core_ file, no package.");
        assert!(the_error.is_package_not_found());
    }

    #[tokio::test]
    async fn the_one_where_the_job_path_is_a_ghost_town() {
        let mut the_bucket = InMemoryBucket::new();
        the_bucket.insert(
            "juju-ci/products/version-1/build-binary-trusty-amd64/build-1/juju-core_1.2.3-trusty-amd64.tgz",
            b"other revision".to_vec(),
        );

        let the_error = find_package_key(&the_bucket, &trusty_amd64(), 4242)
            .await
            .expect_err("💀 Nothing lives under version-4242.");
        assert!(the_error.is_package_not_found());
    }

    #[tokio::test]
    async fn the_one_where_a_matching_key_forgot_its_build_segment() {
        let mut the_bucket = InMemoryBucket::new();
        the_bucket.insert(
            format!("{THE_JOB_PATH}/juju-core_1.2.3-trusty-amd64.tgz"),
            b"who built me".to_vec(),
        );

        let the_error = find_package_key(&the_bucket, &trusty_amd64(), 4242)
            .await
            .expect_err("💀 A candidate without build-<n>/ is a data integrity failure.");
        assert!(matches!(the_error, ResolveError::DataIntegrity { .. }));
        assert!(!the_error.is_package_not_found());
    }

    #[tokio::test]
    async fn the_one_where_asking_twice_gets_the_same_answer() {
        let mut the_bucket = InMemoryBucket::new();
        the_bucket
            .insert(key_under_build(3, "juju-core_1.2.3-trusty-amd64.tgz"), b"3".to_vec())
            .insert(key_under_build(8, "juju-core_1.2.3-trusty-amd64.tgz"), b"8".to_vec())
            .insert(key_under_build(5, "juju-core_1.2.3-trusty-amd64.tgz"), b"5".to_vec());

        let the_first = find_package_key(&the_bucket, &trusty_amd64(), 4242)
            .await
            .expect("💀 first ask");
        let the_second = find_package_key(&the_bucket, &trusty_amd64(), 4242)
            .await
            .expect("💀 second ask");
        assert_eq!(the_first, the_second);
        assert_eq!(
            the_first.key.name,
            key_under_build(8, "juju-core_1.2.3-trusty-amd64.tgz")
        );
    }
}
