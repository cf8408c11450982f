use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use izus_assistant::clients::{DriveApi, PortalApi};
use izus_assistant::error::{AppError, AppResult};
use izus_assistant::models::drive::CreatedFolder;
use izus_assistant::models::{DriveFile, Role, SchoolInfo, Whoami};
use izus_assistant::orchestrator::{refresh_once, spawn_refresh_loop};
use izus_assistant::services::teacher_stats::add_stats_to_teachers;
use izus_assistant::services::{CredentialsHistory, LessonCache, LessonSettings, StatsSettings, TeacherCache};

// ========== 测试替身 ==========

#[derive(Default)]
struct FakePortal {
    logged_in: AtomicBool,
    unavailable: AtomicBool,
    delay: Duration,
    index_html: Mutex<String>,
    index_calls: AtomicUsize,
    staff_html: String,
    staff_calls: AtomicUsize,
    documents: HashMap<u64, String>,
    class_logs: HashMap<(u64, u64), String>,
}

impl FakePortal {
    fn with_index(html: String) -> Self {
        Self {
            index_html: Mutex::new(html),
            ..Default::default()
        }
    }

    fn set_index(&self, html: String) {
        *self.index_html.lock().unwrap() = html;
    }
}

impl PortalApi for FakePortal {
    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    async fn index_page(&self) -> AppResult<String> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::User("portál nedostupný".to_string()));
        }
        Ok(self.index_html.lock().unwrap().clone())
    }

    async fn students_page(&self) -> AppResult<String> {
        Ok(String::new())
    }

    async fn staff_page(&self) -> AppResult<String> {
        self.staff_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.staff_html.clone())
    }

    async fn staff_documents_page(&self, teacher_id: u64) -> AppResult<String> {
        Ok(self.documents.get(&teacher_id).cloned().unwrap_or_default())
    }

    async fn class_log_page(&self, student_id: u64, class_id: u64) -> AppResult<String> {
        Ok(self.class_logs.get(&(student_id, class_id)).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeDrive {
    files: Mutex<HashMap<Option<String>, Vec<DriveFile>>>,
    list_calls: AtomicUsize,
}

impl FakeDrive {
    fn put(&self, folder_id: Option<&str>, files: Vec<DriveFile>) {
        self.files.lock().unwrap().insert(folder_id.map(String::from), files);
    }
}

impl DriveApi for FakeDrive {
    async fn list_files(&self, folder_id: Option<&str>) -> AppResult<Vec<DriveFile>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&folder_id.map(String::from))
            .cloned()
            .unwrap_or_default())
    }

    async fn download(&self, _file_id: &str) -> AppResult<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn create_folder(&self, name: &str, _parent_id: Option<&str>) -> AppResult<CreatedFolder> {
        Ok(CreatedFolder {
            id: format!("id-{}", name),
            name: name.to_string(),
            web_view_link: None,
        })
    }
}

fn index_html(rows: &[(&str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .enumerate()
        .map(|(i, (date, name))| {
            format!(
                r#"<tr><td class="datum_vyuky">{}</td><td class="prijmeni">{}</td><td class="zapsat"><button href="/zapis/{}">Zapsat</button></td></tr>"#,
                date, name, i
            )
        })
        .collect();
    format!(r#"<table class="tridni_kniha"><tr><th>Datum</th><th>Žák</th><th></th></tr>{}</table>"#, rows)
}

fn drive_file(id: &str, name: &str, created: Option<&str>) -> DriveFile {
    DriveFile {
        id: id.to_string(),
        name: name.to_string(),
        created_time: created.map(|c| DateTime::parse_from_rfc3339(c).unwrap().with_timezone(&Utc)),
        mime_type: None,
    }
}

fn settings() -> LessonSettings {
    LessonSettings {
        drive_folder_id: Some("root".to_string()),
        image_offset_hours: 1,
        date_override: None,
    }
}

fn lesson_cache(portal: FakePortal, drive: FakeDrive) -> (Arc<FakePortal>, Arc<FakeDrive>, LessonCache<FakePortal, FakeDrive>) {
    let portal = Arc::new(portal);
    let drive = Arc::new(drive);
    let cache = LessonCache::new(portal.clone(), drive.clone(), settings());
    (portal, drive, cache)
}

// ========== 课程缓存 ==========

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_share_one_fetch() {
    let portal = FakePortal {
        delay: Duration::from_millis(200),
        ..FakePortal::with_index(index_html(&[("5. 3. 2024", "Novák Jan")]))
    };
    let (portal, _drive, cache) = lesson_cache(portal, FakeDrive::default());

    let (a, b) = tokio::join!(cache.get_pending_lessons(false), cache.get_pending_lessons(false));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 1);

    // 已有快照时不再抓取
    let c = cache.get_pending_lessons(false).await.unwrap();
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c.len(), 1);
}

#[tokio::test]
async fn test_force_refresh_fetches_again() {
    let (portal, _drive, cache) = lesson_cache(
        FakePortal::with_index(index_html(&[("5. 3. 2024", "Novák Jan")])),
        FakeDrive::default(),
    );

    let first = cache.get_pending_lessons(false).await.unwrap();
    let second = cache.get_pending_lessons(true).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 2);

    cache.invalidate();
    cache.get_pending_lessons(false).await.unwrap();
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_images_attached_by_creation_date() {
    let drive = FakeDrive::default();
    drive.put(Some("root"), vec![drive_file("f-novak", "Novák Jan", None), drive_file("f-x", "Jiný Žák", None)]);
    drive.put(
        Some("f-novak"),
        vec![
            drive_file("img-old", "old.jpg", Some("2024-03-01T10:00:00Z")),
            drive_file("img-late", "late.jpg", Some("2024-03-04T23:10:00Z")),
        ],
    );
    let (_portal, drive, cache) = lesson_cache(
        FakePortal::with_index(index_html(&[
            ("5. 3. 2024", "Novák Jan (Klavír)"),
            ("6. 3. 2024", "Novák Jan"),
            ("6. 3. 2024", "Svoboda Petr"),
        ])),
        drive,
    );

    let lessons = cache.get_pending_lessons(false).await.unwrap();
    assert_eq!(lessons.len(), 3);
    assert_eq!(lessons[0].image.as_ref().map(|i| i.id.as_str()), Some("img-late"));
    assert_eq!(lessons[0].student.folder_id.as_deref(), Some("f-novak"));
    assert!(lessons[1].image.is_none());
    assert!(lessons[2].image.is_none());
    assert!(lessons[2].student.images.is_none());

    // 根目录一次 + 学生文件夹一次
    assert_eq!(drive.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_lesson_changed_reported_once() {
    let drive = FakeDrive::default();
    drive.put(Some("root"), vec![drive_file("f-novak", "Novák Jan", None)]);
    let (portal, drive, cache) = lesson_cache(
        FakePortal::with_index(index_html(&[("5. 3. 2024", "Novák Jan")])),
        drive,
    );

    // 第一次抓取没有上一份快照，不算变化
    cache.get_pending_lessons(false).await.unwrap();
    assert!(!cache.is_lesson_changed());

    drive.put(Some("f-novak"), vec![drive_file("img", "sesit.jpg", Some("2024-03-05T08:00:00Z"))]);
    cache.get_pending_lessons(true).await.unwrap();
    assert!(cache.is_lesson_changed());
    assert!(!cache.is_lesson_changed());

    // 没有新变化
    cache.get_pending_lessons(true).await.unwrap();
    assert!(!cache.is_lesson_changed());

    // 新的课程带着照片出现
    drive.put(
        Some("f-novak"),
        vec![
            drive_file("img", "sesit.jpg", Some("2024-03-05T08:00:00Z")),
            drive_file("img2", "sesit2.jpg", Some("2024-03-12T08:00:00Z")),
        ],
    );
    portal.set_index(index_html(&[("5. 3. 2024", "Novák Jan"), ("12. 3. 2024", "Novák Jan")]));
    cache.get_pending_lessons(true).await.unwrap();
    assert!(cache.is_lesson_changed());
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let (portal, _drive, cache) = lesson_cache(
        FakePortal::with_index(index_html(&[("5. 3. 2024", "Novák Jan")])),
        FakeDrive::default(),
    );
    portal.unavailable.store(true, Ordering::SeqCst);

    let (a, b) = tokio::join!(cache.get_pending_lessons(false), cache.get_pending_lessons(false));
    let err = a.unwrap_err();
    assert!(matches!(err, AppError::Shared(_)));
    assert_eq!(err.to_string(), "portál nedostupný");
    assert!(b.is_err());

    portal.unavailable.store(false, Ordering::SeqCst);
    let lessons = cache.get_pending_lessons(false).await.unwrap();
    assert_eq!(lessons.len(), 1);
}

#[tokio::test]
async fn test_refresh_once_requires_login() {
    let (portal, _drive, cache) = lesson_cache(
        FakePortal::with_index(index_html(&[("5. 3. 2024", "Novák Jan"), ("6. 3. 2024", "Svoboda Petr")])),
        FakeDrive::default(),
    );

    assert!(matches!(refresh_once(&cache).await, Err(AppError::NotLoggedIn)));
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 0);

    portal.logged_in.store(true, Ordering::SeqCst);
    assert_eq!(refresh_once(&cache).await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_during_fetch_does_not_commit() {
    let portal = FakePortal {
        delay: Duration::from_millis(200),
        ..FakePortal::with_index(index_html(&[("5. 3. 2024", "Novák Jan")]))
    };
    let (portal, _drive, cache) = lesson_cache(portal, FakeDrive::default());

    let (stale, _) = tokio::join!(cache.get_pending_lessons(false), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.invalidate();
    });
    // 已开始的抓取仍然返回给等待方
    assert_eq!(stale.unwrap().len(), 1);
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 1);

    // 但结果没有写入清空后的缓存
    portal.set_index(index_html(&[("5. 3. 2024", "Novák Jan"), ("6. 3. 2024", "Svoboda Petr")]));
    let fresh = cache.get_pending_lessons(false).await.unwrap();
    assert_eq!(fresh.len(), 2);
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_loop_keeps_ticking_after_failures() {
    let (portal, _drive, cache) = lesson_cache(
        FakePortal::with_index(index_html(&[("5. 3. 2024", "Novák Jan")])),
        FakeDrive::default(),
    );
    portal.logged_in.store(true, Ordering::SeqCst);
    portal.unavailable.store(true, Ordering::SeqCst);

    let handle = spawn_refresh_loop(Arc::new(cache), Duration::from_secs(10), true);

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 3);

    portal.unavailable.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 4);
    assert!(!handle.is_finished());

    handle.abort();
}

// ========== 教师统计 ==========

fn documents_html(options: &[(&str, &str)]) -> String {
    let options: String = options
        .iter()
        .map(|(value, text)| format!(r#"<option value="{}">{}</option>"#, value, text))
        .collect();
    format!(r#"<select id="zobrazit_tridni_knihu"><option value="">--</option>{}</select>"#, options)
}

fn class_log_html(texts: &[&str]) -> String {
    let rows: String = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            format!(
                r#"<tr><td class="datum">{}. 3. 2024</td><td class="dochazka">I</td><td class="probirana_latka">{}</td></tr>"#,
                i + 1,
                text
            )
        })
        .collect();
    format!(r#"<table class="latka"><tbody>{}</tbody></table>"#, rows)
}

fn stats_portal() -> FakePortal {
    let staff_html = r#"
        <table id="tabulka_zamestnancu"><tbody>
            <tr><td class="prijmeni"><input name="zamestnanci[]" value="1">Adámek</td><td>Aleš</td></tr>
            <tr><td class="prijmeni"><input name="zamestnanci[]" value="2">Bartoš</td><td>Bořek</td></tr>
            <tr><td class="prijmeni"><input name="zamestnanci[]" value="3">Cibulka</td><td>Cyril</td></tr>
        </tbody></table>"#
        .to_string();

    let documents = HashMap::from([
        (1, documents_html(&[("11_1", "Novák Jan (Klavír)")])),
        (2, documents_html(&[("12_2", "Malá Eva (Housle)")])),
        (3, documents_html(&[])),
    ]);
    let class_logs = HashMap::from([
        ((11, 1), class_log_html(&["Stupnice C dur", "Stupnice C dur"])),
        ((12, 2), class_log_html(&["Etuda a sonatina pro klavír", "Menuet G dur a stupnice D dur"])),
    ]);

    FakePortal {
        staff_html,
        documents,
        class_logs,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_teacher_cache_fetches_once() {
    let portal = stats_portal();
    let cache = TeacherCache::new();

    let a = cache.get_teachers(&portal).await.unwrap();
    let b = cache.get_teachers(&portal).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.len(), 3);
    assert_eq!(portal.staff_calls.load(Ordering::SeqCst), 1);

    cache.invalidate().await;
    cache.get_teachers(&portal).await.unwrap();
    assert_eq!(portal.staff_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_add_stats_to_teachers_in_batches() {
    let portal = stats_portal();
    let teachers = TeacherCache::new().get_teachers(&portal).await.unwrap();
    let settings = StatsSettings {
        chunk: 2,
        delay: Duration::from_secs(5),
        max_teachers: None,
        max_classes: None,
    };

    let start = tokio::time::Instant::now();
    let ranked = add_stats_to_teachers(&portal, &teachers, &settings).await.unwrap();
    let elapsed = start.elapsed();

    // 两批之间等待一次，最后一批之后不等待
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(10));

    let ids: Vec<u64> = ranked.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let first = ranked[0].stats.as_ref().unwrap();
    assert_eq!(first.similarity, Some(1.0));
    assert_eq!(first.similarity_percentile, Some(1.0));
    assert_eq!(first.length_percentile, Some(1.0));
    assert_eq!(first.avg_percentile, Some(1.0));

    let second = ranked[1].stats.as_ref().unwrap();
    assert_eq!(second.avg_percentile, Some(0.0));

    let last = ranked[2].stats.as_ref().unwrap();
    assert!(!last.is_valid());
    assert_eq!(last.avg_percentile, None);
}

#[tokio::test]
async fn test_add_stats_respects_max_teachers() {
    let portal = stats_portal();
    let teachers = TeacherCache::new().get_teachers(&portal).await.unwrap();
    let settings = StatsSettings {
        chunk: 20,
        delay: Duration::ZERO,
        max_teachers: Some(1),
        max_classes: None,
    };

    let ranked = add_stats_to_teachers(&portal, &teachers, &settings).await.unwrap();
    assert_eq!(ranked.len(), 1);
    // 只有一位有效教师，无法计算百分位
    let stats = ranked[0].stats.as_ref().unwrap();
    assert!(stats.is_valid());
    assert_eq!(stats.similarity_percentile, None);
}

// ========== 登录历史 ==========

fn whoami(id: u64, user: &str) -> Whoami {
    Whoami {
        id,
        user: user.to_string(),
        user_name: user.to_uppercase(),
        school: SchoolInfo::Label("ZUŠ".to_string()),
        admin: false,
        role: Role::Employee,
        role_name: Role::Employee.name().to_string(),
    }
}

#[tokio::test]
async fn test_credentials_history_replaces_same_user() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("auth").join("credentials-history.json");

    let mut history = CredentialsHistory::load(&file).await;
    assert!(history.is_empty());

    history.add(whoami(1, "novak")).await.unwrap();
    history.add(whoami(2, "mala")).await.unwrap();
    history.add(whoami(1, "novak2")).await.unwrap();
    assert_eq!(history.entries().len(), 2);

    let reloaded = CredentialsHistory::load(&file).await;
    assert_eq!(reloaded.entries().len(), 2);
    let newest = reloaded.newest_first();
    assert_eq!(newest[0].whoami.user, "novak2");
    assert_eq!(newest[1].whoami.user, "mala");
}

#[tokio::test]
async fn test_corrupted_credentials_history_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("credentials-history.json");
    tokio::fs::write(&file, "{ nope").await.unwrap();

    let history = CredentialsHistory::load(&file).await;
    assert!(history.is_empty());
}

#[test]
fn test_lesson_date_fixture() {
    let lessons = izus_assistant::parsers::parse_pending_lessons(&index_html(&[("15. 11. 2024", "Svoboda Petr")]), None).unwrap();
    assert_eq!(lessons[0].date, NaiveDate::from_ymd_opt(2024, 11, 15).unwrap());
}
