use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    assessment::{Assessment, StressLevel},
    error::Error,
    history::{self, TestResult},
};

/// Separator for recommendations in the flat persisted form.
const RECOMMENDATION_SEPARATOR: &str = "; ";

/// Persistence for assessment results. Results are only ever appended.
pub trait ResultStore: Send + Sync {
    fn create(&self, owner: Option<&str>, assessment: &Assessment) -> Result<TestResult, Error>;

    /// All results of `owner`, newest first.
    fn list_by_owner(&self, owner: Option<&str>) -> Result<Vec<TestResult>, Error>;

    fn latest_by_owner(&self, owner: Option<&str>) -> Result<Option<TestResult>, Error> {
        let results = self.list_by_owner(owner)?;
        Ok(history::latest(&results).cloned())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Error> {
    mutex
        .lock()
        .map_err(|_| Error::Persistence("result store lock poisoned".to_string()))
}

fn owned_by(result: &TestResult, owner: Option<&str>) -> bool {
    result.owner.as_deref() == owner
}

fn sorted_newest_first(results: Vec<TestResult>) -> Vec<TestResult> {
    history::newest_first(&results).into_iter().cloned().collect()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    results: Mutex<Vec<TestResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryStore {
    fn create(&self, owner: Option<&str>, assessment: &Assessment) -> Result<TestResult, Error> {
        let mut results = lock(&self.results)?;
        let result = TestResult {
            id: results.len() as u64 + 1,
            owner: owner.map(str::to_string),
            score: assessment.score,
            level: assessment.level,
            recommendations: assessment.recommendations.clone(),
            created_at: Utc::now(),
        };
        results.push(result.clone());
        debug!(id = result.id, score = result.score, "stored result in memory");
        Ok(result)
    }

    fn list_by_owner(&self, owner: Option<&str>) -> Result<Vec<TestResult>, Error> {
        let results = lock(&self.results)?;
        let owned = results
            .iter()
            .filter(|r| owned_by(r, owner))
            .cloned()
            .collect();
        Ok(sorted_newest_first(owned))
    }
}

/// One line of the results file.
#[derive(Debug, Serialize, Deserialize)]
struct Row {
    id: u64,
    owner: Option<String>,
    score: u32,
    level: StressLevel,
    recommendations: String,
    created_at: DateTime<Utc>,
}

impl From<&TestResult> for Row {
    fn from(result: &TestResult) -> Self {
        Row {
            id: result.id,
            owner: result.owner.clone(),
            score: result.score,
            level: result.level,
            recommendations: result.recommendations.join(RECOMMENDATION_SEPARATOR),
            created_at: result.created_at,
        }
    }
}

impl From<Row> for TestResult {
    fn from(row: Row) -> Self {
        TestResult {
            id: row.id,
            owner: row.owner.filter(|owner| !owner.is_empty()),
            score: row.score,
            level: row.level,
            recommendations: row
                .recommendations
                .split(RECOMMENDATION_SEPARATOR)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .collect(),
            created_at: row.created_at,
        }
    }
}

/// Append-only CSV file of results, shared by the offline questionnaire and
/// the HTTP service.
///
/// Every handle, in this process or another, serializes on an advisory lock
/// taken on a `.lock` file next to the results. Writers hold it exclusively
/// from reading the highest id until the new row is flushed.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl CsvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        info!("Using result file {}", path.display());
        Ok(Self {
            path,
            lock_path: PathBuf::from(lock_path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the lock file and blocks until the lock is held. It is released
    /// when the returned file is dropped.
    fn acquire(&self, exclusive: bool) -> Result<File, Error> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        if exclusive {
            FileExt::lock_exclusive(&lock)?;
        } else {
            FileExt::lock_shared(&lock)?;
        }
        Ok(lock)
    }

    fn read_all(&self) -> Result<Vec<TestResult>, Error> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut reader = csv::Reader::from_reader(BufReader::new(file));
        reader
            .deserialize::<Row>()
            .map(|row| row.map(TestResult::from).map_err(Error::from))
            .collect()
    }
}

impl ResultStore for CsvStore {
    fn create(&self, owner: Option<&str>, assessment: &Assessment) -> Result<TestResult, Error> {
        let _lock = self.acquire(true)?;
        let id = self.read_all()?.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let result = TestResult {
            id,
            owner: owner.map(str::to_string),
            score: assessment.score,
            level: assessment.level,
            recommendations: assessment.recommendations.clone(),
            created_at: Utc::now(),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let new_file = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer.serialize(Row::from(&result))?;
        writer.flush()?;

        debug!(id = result.id, score = result.score, "appended result");
        Ok(result)
    }

    fn list_by_owner(&self, owner: Option<&str>) -> Result<Vec<TestResult>, Error> {
        let _lock = self.acquire(false)?;
        let owned = self
            .read_all()?
            .into_iter()
            .filter(|r| owned_by(r, owner))
            .collect();
        Ok(sorted_newest_first(owned))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{answer::AnswerSet, assessment::assess};
    use std::{
        sync::{Arc, Barrier},
        thread,
    };

    fn assessment(values: [i64; 7]) -> Assessment {
        assess(&AnswerSet::try_from(&values[..]).unwrap())
    }

    fn exercise(store: &dyn ResultStore) {
        assert_eq!(store.latest_by_owner(Some("ann")).unwrap(), None);

        let first = store.create(Some("ann"), &assessment([5; 7])).unwrap();
        let second = store.create(Some("ann"), &assessment([1; 7])).unwrap();
        store.create(Some("bob"), &assessment([3; 7])).unwrap();
        store.create(None, &assessment([2; 7])).unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.score, 35);
        assert_eq!(first.level, StressLevel::High);

        let ann = store.list_by_owner(Some("ann")).unwrap();
        let ids: Vec<u64> = ann.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(ann[1], first);

        let latest = store.latest_by_owner(Some("ann")).unwrap();
        assert_eq!(latest, Some(second));

        let anonymous = store.list_by_owner(None).unwrap();
        assert_eq!(anonymous.len(), 1);
        assert_eq!(anonymous[0].owner, None);
        assert_eq!(anonymous[0].score, 14);

        assert!(store.list_by_owner(Some("carol")).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_csv_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path().join("data").join("results.csv")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_csv_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let created = CsvStore::open(&path)
            .unwrap()
            .create(Some("ann"), &assessment([2, 2, 2, 2, 2, 2, 2]))
            .unwrap();

        let reopened = CsvStore::open(&path).unwrap();
        let results = reopened.list_by_owner(Some("ann")).unwrap();
        assert_eq!(results, vec![created.clone()]);
        assert_eq!(results[0].recommendations.len(), 4);

        let next = reopened.create(Some("ann"), &assessment([1; 7])).unwrap();
        assert_eq!(next.id, created.id + 1);
    }

    #[test]
    fn test_csv_handles_share_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let barrier = Arc::new(Barrier::new(2));

        let writers: Vec<_> = ["ann", "bob"]
            .into_iter()
            .map(|owner| {
                let store = CsvStore::open(&path).unwrap();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..20 {
                        store.create(Some(owner), &assessment([3; 7])).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let store = CsvStore::open(&path).unwrap();
        let mut ids: Vec<u64> = ["ann", "bob"]
            .into_iter()
            .flat_map(|owner| store.list_by_owner(Some(owner)).unwrap())
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=40).collect::<Vec<u64>>());

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().filter(|line| line.starts_with("id,")).count(), 1);
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let store = CsvStore::open(&path).unwrap();
        store.create(None, &assessment([1; 7])).unwrap();
        store.create(Some("ann"), &assessment([1; 7])).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id,owner,score,level,recommendations,created_at");
        assert!(lines[1].starts_with(
            "1,,7,Low stress,Continue your healthy habits; Practice mindfulness regularly; Maintain work-life balance,"
        ));
        assert!(lines[2].starts_with("2,ann,7,Low stress,"));
    }

    #[test]
    fn test_csv_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(
            &path,
            "id,owner,score,level,recommendations,created_at\nx,ann,7,Low stress,,now\n",
        )
        .unwrap();
        let store = CsvStore::open(&path).unwrap();
        assert!(matches!(
            store.list_by_owner(Some("ann")),
            Err(Error::Persistence(_))
        ));
    }
}
