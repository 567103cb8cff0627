#[cfg(test)]
mod tests {
    use crate::builders::catalog::{DEFAULT_SEQUENCE, DEFAULT_TARGET};
    use crate::builders::passes::RewritePass;
    use crate::builders::rules::RewriteRule;
    use crate::builders::storage::{BackupData, FileStorage, StorageProvider};
    use crate::core::config::{BackupStrategy, ConfigManager, ConfigProvider, RewriteConfig};
    use crate::core::engine::RewriteEngine;
    use git2::Repository;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    const PAGE: &str = "\
const { t } = useTranslation()
toast({ title: 'تم النسخ', description: 'تم نسخ رابط الشهادة' })
<span>دقيقة</span>
<Button>إغلاق</Button>
<p>{date.toLocaleDateString('ar-EG')}</p>
";

    const REWRITTEN: &str = "\
const { t, lang } = useTranslation()
toast({ title: t('exams.examResult.messages.linkCopied'), description: t('exams.examResult.messages.linkCopiedDesc') })
<span>{t('exams.examResult.stats.minutes')}</span>
<Button>{t('exams.examResult.actions.close')}</Button>
<p>{date.toLocaleDateString(lang === 'ar' ? 'ar-EG' : 'en-US')}</p>
";

    fn setup_project(strategy: BackupStrategy) -> (tempfile::TempDir, ConfigManager, PathBuf) {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let page = root.join(DEFAULT_TARGET);
        fs::create_dir_all(page.parent().unwrap()).unwrap();
        fs::write(&page, PAGE).unwrap();

        let manager = ConfigManager::new_at(root).unwrap();
        let mut config = RewriteConfig::default();
        config.global_settings.backup_strategy = strategy;
        manager.save_config(&config).unwrap();
        (dir, manager, page)
    }

    fn sequence(manager: &ConfigManager) -> Vec<RewritePass> {
        manager.load_config().unwrap().resolve_passes(&DEFAULT_SEQUENCE).unwrap()
    }

    #[test]
    fn test_sequence_rewrites_page() {
        let (_dir, manager, page) = setup_project(BackupStrategy::Memory);
        let passes = sequence(&manager);
        let mut engine = RewriteEngine::new(manager).unwrap();

        let outcome = engine.run(&passes, &page, false).unwrap();
        assert!(outcome.changed);
        assert!(outcome.written);
        assert_eq!(outcome.passes.len(), DEFAULT_SEQUENCE.len());
        assert_eq!(fs::read_to_string(&page).unwrap(), REWRITTEN);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let (_dir, manager, page) = setup_project(BackupStrategy::Memory);
        let passes = sequence(&manager);
        let mut engine = RewriteEngine::new(manager).unwrap();

        engine.run(&passes, &page, false).unwrap();
        let again = engine.run(&passes, &page, false).unwrap();
        assert!(!again.changed);
        assert!(!again.written);
        assert_eq!(again.text, REWRITTEN);
        // Only the first run took a backup
        assert_eq!(engine.backups(&page).unwrap().len(), 1);
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let (_dir, manager, page) = setup_project(BackupStrategy::Memory);
        let passes = sequence(&manager);
        let mut engine = RewriteEngine::new(manager).unwrap();

        let outcome = engine.run(&passes, &page, true).unwrap();
        assert!(outcome.changed);
        assert!(!outcome.written);
        assert_eq!(outcome.text, REWRITTEN);
        assert_eq!(fs::read_to_string(&page).unwrap(), PAGE);
        assert!(engine.backups(&page).unwrap().is_empty());
    }

    #[test]
    fn test_file_backup_survives_engine_and_restores() {
        let (dir, manager, page) = setup_project(BackupStrategy::File);
        let passes = sequence(&manager);
        let mut engine = RewriteEngine::new(manager).unwrap();
        engine.run(&passes, &page, false).unwrap();
        drop(engine);

        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
        let mut engine = RewriteEngine::new(manager).unwrap();
        let backups = engine.backups(&page).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].passes, DEFAULT_SEQUENCE.to_vec());

        let restored = engine.restore(&page).unwrap().unwrap();
        assert_eq!(restored.original_content, PAGE);
        assert_eq!(fs::read_to_string(&page).unwrap(), PAGE);
        assert!(engine.restore(&page).unwrap().is_none());
    }

    #[test]
    fn test_disabled_backups_still_write() {
        let (_dir, manager, page) = setup_project(BackupStrategy::Disabled);
        let passes = manager.load_config().unwrap().resolve_passes(&["translations"]).unwrap();
        let mut engine = RewriteEngine::new(manager).unwrap();

        assert!(engine.run(&passes, &page, false).unwrap().written);
        assert!(engine.restore(&page).unwrap().is_none());
    }

    #[test]
    fn test_broken_pass_aborts_before_writing() {
        let (_dir, manager, page) = setup_project(BackupStrategy::Memory);
        let mut passes = sequence(&manager);
        passes.push(RewritePass::new(
            "broken",
            "",
            "",
            vec![RewriteRule::regex("broken-01", "(", "x")],
        ));
        let mut engine = RewriteEngine::new(manager).unwrap();

        assert!(engine.run(&passes, &page, false).is_err());
        assert_eq!(fs::read_to_string(&page).unwrap(), PAGE);
    }

    #[test]
    fn test_require_clean_refuses_untracked_target() {
        let (dir, manager, page) = setup_project(BackupStrategy::Memory);
        Repository::init(dir.path()).unwrap();

        let mut config = manager.load_config().unwrap();
        config.global_settings.require_clean = true;
        manager.save_config(&config).unwrap();

        let passes = sequence(&manager);
        let mut engine = RewriteEngine::new(manager).unwrap();
        let err = engine.run(&passes, &page, false).unwrap_err();
        assert!(err.to_string().contains("uncommitted changes"));
        assert_eq!(fs::read_to_string(&page).unwrap(), PAGE);

        // A dry run never needs a clean tree
        assert!(engine.run(&passes, &page, true).is_ok());
    }

    #[test]
    fn test_idempotence_report_for_sequence() {
        let (_dir, manager, page) = setup_project(BackupStrategy::Memory);
        let passes = sequence(&manager);
        let engine = RewriteEngine::new(manager).unwrap();

        let report = engine.check_idempotence(&passes, &page).unwrap();
        assert_eq!(report.len(), DEFAULT_SEQUENCE.len());
        for (pass, offenders) in report {
            assert!(offenders.is_empty(), "{pass}: {offenders:?}");
        }
    }

    #[test]
    fn test_restore_keeps_flat_and_nested_files_apart() {
        let (dir, manager, _page) = setup_project(BackupStrategy::File);
        let flat = dir.path().join("src_a.jsx");
        let nested = dir.path().join("src").join("a.jsx");
        fs::write(&flat, "<p>إغلاق</p> FLAT").unwrap();
        fs::write(&nested, "<p>إغلاق</p> NESTED").unwrap();

        let passes = manager.load_config().unwrap().resolve_passes(&["translations"]).unwrap();
        let mut engine = RewriteEngine::new(manager).unwrap();
        engine.run(&passes, &flat, false).unwrap();
        engine.run(&passes, &nested, false).unwrap();

        engine.restore(&flat).unwrap().unwrap();
        assert_eq!(fs::read_to_string(&flat).unwrap(), "<p>إغلاق</p> FLAT");
        assert_eq!(
            fs::read_to_string(&nested).unwrap(),
            "<p>t('exams.examResult.actions.close')</p> NESTED"
        );
        assert!(engine.restore(&flat).unwrap().is_none());
        assert_eq!(engine.backups(&nested).unwrap().len(), 1);
    }

    #[test]
    fn test_restore_refuses_backup_of_another_file() {
        let (_dir, manager, page) = setup_project(BackupStrategy::File);
        let mut storage = FileStorage::new(manager.backup_dir()).unwrap();
        storage
            .store_backup(
                DEFAULT_TARGET,
                BackupData::new(
                    Path::new("other.jsx"),
                    vec!["translations".to_string()],
                    "other".to_string(),
                ),
            )
            .unwrap();

        let mut engine = RewriteEngine::new(manager).unwrap();
        let err = engine.restore(&page).unwrap_err();
        assert!(err.to_string().contains("other.jsx"));
        assert_eq!(fs::read_to_string(&page).unwrap(), PAGE);
        // The backup is still there
        assert_eq!(engine.backups(&page).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_backup_leaves_target_untouched() {
        let (_dir, manager, page) = setup_project(BackupStrategy::File);
        let backup_dir = manager.backup_dir();
        let passes = sequence(&manager);
        let mut engine = RewriteEngine::new(manager).unwrap();

        // Replace the backup directory with a plain file so storing fails
        fs::remove_dir_all(&backup_dir).unwrap();
        fs::write(&backup_dir, "").unwrap();

        assert!(engine.run(&passes, &page, false).is_err());
        assert_eq!(fs::read_to_string(&page).unwrap(), PAGE);
    }
}
