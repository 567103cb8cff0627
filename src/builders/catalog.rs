//! Built-in rewrite passes for the exam result page.
//!
//! Every pass is a flat rule table. Order inside a table matters: longer
//! phrases come before any shorter phrase they contain.

use crate::builders::passes::RewritePass;
use crate::builders::rules::RewriteRule;

/// File the page passes were written for, relative to the project root.
pub const DEFAULT_TARGET: &str = "src/pages/ExamResultPage.jsx";

/// File the `api-cleanup` pass was written for.
pub const API_TARGET: &str = "src/services/api.js";

/// Order in which the page passes are meant to run.
pub const DEFAULT_SEQUENCE: [&str; 7] = [
    "translations",
    "certificate",
    "jsx-expressions",
    "finalize",
    "syntax-errors",
    "syntax-ops",
    "i18n-variable",
];

/// Preceding text that means a `t(...)` call is already braced or is part of
/// a longer identifier.
const BRACED_OR_IDENT: &str = r"[{A-Za-z0-9_]";

pub fn builtin_passes() -> Vec<RewritePass> {
    vec![
        translations(),
        certificate(),
        jsx_expressions(),
        finalize(),
        syntax_errors(),
        syntax_ops(),
        i18n_variable(),
        api_cleanup(),
    ]
}

pub fn builtin_pass(name: &str) -> Option<RewritePass> {
    builtin_passes().into_iter().find(|pass| pass.name == name)
}

/// Builds a literal table with ids `<prefix>-NN`.
fn literal_table(prefix: &str, entries: &[(&str, &str)]) -> Vec<RewriteRule> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (pattern, replacement))| {
            RewriteRule::literal(&format!("{prefix}-{:02}", i + 1), pattern, replacement)
        })
        .collect()
}

fn translations() -> RewritePass {
    let rules = literal_table(
        "translations",
        &[
            // Error messages
            (
                "'لم تقدم هذا الامتحان بعد. يجب تقديم الامتحان أولاً لرؤية النتيجة.'",
                "t('exams.examResult.messages.notSubmittedDesc')",
            ),
            ("'لم تقدم الامتحان'", "t('exams.examResult.messages.notSubmitted')"),
            (
                "'يجب تقديم الامتحان أولاً لرؤية النتيجة'",
                "t('exams.examResult.messages.notSubmittedDesc')",
            ),
            ("'خطأ في تحميل النتيجة'", "t('exams.examResult.messages.loadingError')"),
            (
                "'انتهت جلسة العمل. يرجى تسجيل الدخول مرة أخرى'",
                "t('exams.examResult.errors.sessionExpired')",
            ),
            ("'خطأ في الاتصال بالإنترنت'", "t('exams.examResult.errors.networkError')"),
            ("'حدث خطأ غير معروف'", "t('exams.examResult.errors.unknownError')"),
            ("'خطأ'", "t('exams.examResult.errors.errorTitle')"),
            // Success messages
            ("'تم التحديث'", "t('exams.examResult.messages.refreshed')"),
            ("'تم جلب أحدث بيانات النتيجة'", "t('exams.examResult.messages.refreshedDesc')"),
            ("'جاري التحضير'", "t('exams.examResult.messages.preparingPrint')"),
            (
                "'سيتم فتح نافذة جديدة لطباعة الشهادة'",
                "t('exams.examResult.messages.preparingPrintDesc')",
            ),
            ("'تم النسخ'", "t('exams.examResult.messages.linkCopied')"),
            ("'تم نسخ رابط الشهادة'", "t('exams.examResult.messages.linkCopiedDesc')"),
            // Page content
            ("'النتيجة غير متاحة'", "t('exams.examResult.messages.resultNotAvailable')"),
            ("'تهانينا! لقد أنهيت الامتحان بنجاح'", "t('exams.examResult.congratulations')"),
            ("'حاول مرة أخرى للوصول إلى النسبة المطلوبة'", "t('exams.examResult.tryAgain')"),
            // Buttons
            ("العودة إلى الامتحانات", "t('exams.examResult.actions.backToExams')"),
            ("تقديم الامتحان الآن", "t('exams.examResult.actions.submitNow')"),
            ("تحديث النتيجة", "t('exams.examResult.actions.refreshResult')"),
            ("عرض الشهادة", "t('exams.examResult.certificate.viewCertificate')"),
            ("إعادة الامتحان", "t('exams.examResult.actions.retakeExam')"),
            ("طباعة الشهادة", "t('exams.examResult.certificate.printCertificate')"),
            ("تنزيل الشهادة", "t('exams.examResult.certificate.downloadCertificate')"),
            ("مشاركة الشهادة", "t('exams.examResult.certificate.shareCertificate')"),
            ("إغلاق", "t('exams.examResult.actions.close')"),
            // Stats labels
            ("الدرجة النهائية", "t('exams.examResult.stats.finalScore')"),
            ("النسبة المئوية", "t('exams.examResult.stats.percentage')"),
            ("الوقت المستغرق", "t('exams.examResult.stats.timeSpent')"),
            ("تاريخ الإكمال", "t('exams.examResult.stats.completionDate')"),
            ("من الدرجة الكلية", "t('exams.examResult.stats.ofTotal')"),
            (">دقيقة<", ">{t('exams.examResult.stats.minutes')}<"),
            // Leaves the quote open on purpose: the clock text that follows
            // becomes the concatenated string, `finalize` closes the brace.
            ("الساعة ", "t('exams.examResult.stats.at') + ' "),
            // Analysis section
            ("تحليل مفصل للأداء", "t('exams.examResult.analysis.title')"),
            ("ملخص أدائك في الامتحان", "t('exams.examResult.analysis.subtitle')"),
            ("إجابات صحيحة", "t('exams.examResult.analysis.correctAnswers')"),
            ("إجابات خاطئة", "t('exams.examResult.analysis.incorrectAnswers')"),
            ("إجمالي الأسئلة", "t('exams.examResult.analysis.totalQuestions')"),
            ("معدل النجاح", "t('exams.examResult.analysis.successRate')"),
            ("مستوى الأداء", "t('exams.examResult.analysis.performanceLevel')"),
            ("التصنيف", "t('exams.examResult.analysis.classification')"),
            // Performance feedback
            (
                "'أداء استثنائي! أنت من الطلاب المتميزين'",
                "t('exams.examResult.analysis.feedback.excellent')",
            ),
            ("'أداء ممتاز! حافظ على هذا المستوى'", "t('exams.examResult.analysis.feedback.veryGood')"),
            ("'أداء جيد جداً! يمكنك التحسين أكثر'", "t('exams.examResult.analysis.feedback.good')"),
            (
                "'أداء مقبول! تحتاج إلى مزيد من الجهد'",
                "t('exams.examResult.analysis.feedback.acceptable')",
            ),
            (
                "'تحتاج إلى التركيز أكثر والاستعداد جيداً'",
                "t('exams.examResult.analysis.feedback.failed')",
            ),
        ],
    );

    RewritePass::new(
        "translations",
        "Replace hardcoded Arabic messages, buttons and labels with t() calls",
        "Replacements completed successfully!",
        rules,
    )
}

fn certificate() -> RewritePass {
    let rules = literal_table(
        "certificate",
        &[
            // Headers and titles
            ("شهادة الإنجاز الأكاديمي", "t('exams.examResult.certificate.title')"),
            (
                "شهادة معتمدة لإنجازك المتميز في الامتحان",
                "t('exams.examResult.certificate.certifiedBy')",
            ),
            // Body
            (
                "تُمنح هذه الشهادة إلى الطالب المتميز",
                "t('exams.examResult.certificate.awardedTo')",
            ),
            (
                "تمنح هذه الشهادة تقديراً للتميز الأكاديمي",
                "t('exams.examResult.certificate.honoredFor')",
            ),
            ("تقديراً للتميز الأكاديمي", "t('exams.examResult.certificate.forExcellence')"),
            (
                "تقديراً لإنجازه البارز في اجتياز امتحان",
                "t('exams.examResult.certificate.forAchievement')",
            ),
            (
                "بمستوى أداء استثنائي يدل على التميز والتفوق",
                "t('exams.examResult.certificate.exceptionalPerformance')",
            ),
            // Signatures and seals
            ("ختم المنصة الرسمي", "t('exams.examResult.certificate.officialSeal')"),
            ("مدير منصة EduMaster", "t('exams.examResult.certificate.platformManager')"),
            ("المشرف الأكاديمي", "t('exams.examResult.certificate.academicSupervisor')"),
            (">التوقيع<", ">{t('exams.examResult.certificate.signature')}<"),
            ("التوقيع الرسمي", "t('exams.examResult.certificate.officialSignature')"),
            // Metadata
            ("تاريخ الإصدار", "t('exams.examResult.certificate.issueDate')"),
            ("رقم الشهادة", "t('exams.examResult.certificate.certificateNumber')"),
            (
                "هذه الشهادة معتمدة رسمياً من منصة EduMaster التعليمية",
                "t('exams.examResult.certificate.certifiedOfficial')",
            ),
            ("جميع الحقوق محفوظة ©", "t('exams.examResult.certificate.allRightsReserved')"),
            (
                "للتحقق من صحة الشهادة، يرجى زيارة موقع المنصة الرسمي",
                "t('exams.examResult.certificate.verifyOnline')",
            ),
            // Stats labels
            ("التقدير الأكاديمي", "t('exams.examResult.certificate.academicGrade')"),
            ("التقدير", "t('exams.examResult.certificate.grade')"),
            ("إنجاز متميز", "t('exams.examResult.certificate.distinctiveAchievement')"),
            // Student name fallback
            (
                "user?.fullName || 'الطالب'",
                "user?.fullName || t('exams.examResult.certificate.student')",
            ),
        ],
    );

    RewritePass::new(
        "certificate",
        "Replace the certificate template's Arabic text with t() calls",
        "Certificate translations completed successfully!",
        rules,
    )
}

fn jsx_expressions() -> RewritePass {
    let rules = vec![
        // <span>t('key')</span> -> <span>{t('key')}</span>
        RewriteRule::regex("jsx-expressions-01", r">t\(('[^']+')\)<", ">{t(${1})}<"),
        RewriteRule::regex("jsx-expressions-02", r">\s*t\(('exams\.[^']+')\)\s*<", ">{t(${1})}<"),
        // Element text with surrounding whitespace kept inside the braces
        RewriteRule::regex("jsx-expressions-03", r">(\s*)t\(([^\)]+)\)(\s*)<", ">{${1}t(${2})${3}}<"),
        // Attribute values: className="t('key')" -> className={t('key')}
        RewriteRule::regex("jsx-expressions-04", r#""t\(([^\)]+)\)""#, "{t(${1})}"),
    ];

    RewritePass::new(
        "jsx-expressions",
        "Wrap bare t() calls in JSX text and attribute values in braces",
        "Fixed translation function calls!",
        rules,
    )
}

fn finalize() -> RewritePass {
    let rules = vec![
        RewriteRule::regex("finalize-01", r"t\('exams\.examResult\.[^']+'\)", "{${0}}")
            .skip_after(BRACED_OR_IDENT)
            .note("wrap raw calls that are not already braced"),
        // {t('k')} + ' ' -> {t('k') + ' '}
        RewriteRule::regex("finalize-02", r"\}\s*\+\s*'([^']*)'", " + '${1}'}"),
        RewriteRule::literal(
            "finalize-03",
            "محمود أشرف",
            "{t('exams.examResult.certificate.managerName')}",
        ),
        RewriteRule::literal(
            "finalize-04",
            "يوسف حسام",
            "{t('exams.examResult.certificate.supervisorName')}",
        ),
        RewriteRule::regex("finalize-05", r"\{\{t\('([^']+)'\)\}\}", "{t('${1}')}")
            .note("collapse double braces"),
        RewriteRule::literal(
            "finalize-06",
            "const { t } = useTranslation()",
            "const { t, i18n } = useTranslation()",
        ),
        RewriteRule::literal("finalize-07", "'ar-EG'", "i18n.language === 'ar' ? 'ar-EG' : 'en-US'")
            .skip_after(r"\?\s*")
            .note("pick the date locale from the active language"),
    ];

    RewritePass::new(
        "finalize",
        "Brace remaining raw calls, fix concatenations, names and the date locale",
        "Fixed translation syntax and hardcoded names.",
        rules,
    )
}

fn syntax_errors() -> RewritePass {
    let rules = vec![
        // label: {t('k')} -> label: t('k')
        RewriteRule::regex(
            "syntax-errors-01",
            r"([a-zA-Z0-9_]+)\s*:\s*\{t\('([^']+)'\)\}",
            "${1}: t('${2}')",
        ),
        // errorMessage = {t('k')} -> errorMessage = t('k'); `prop={...}` has no spaces and is kept
        RewriteRule::regex(
            "syntax-errors-02",
            r"([a-zA-Z0-9_]+)\s+=\s+\{t\('([^']+)'\)\}",
            "${1} = t('${2}')",
        ),
        // setError({t('k')}) -> setError(t('k'))
        RewriteRule::regex("syntax-errors-03", r"\(\s*\{t\('([^']+)'\)\}\s*\)", "(t('${1}'))"),
        RewriteRule::regex("syntax-errors-04", r"\{\{t\('([^']+)'\)\}\}", "{t('${1}')}"),
    ];

    RewritePass::new(
        "syntax-errors",
        "Remove braces around t() calls in object values, assignments and arguments",
        "Fixed syntax errors (removed extra curly braces).",
        rules,
    )
}

fn syntax_ops() -> RewritePass {
    let rules = vec![
        // error || {t('k')} -> error || t('k')
        RewriteRule::regex(
            "syntax-ops-01",
            r"(\|\||&&|\?|:)\s*\{t\('([^']+)'\)\}",
            "${1} t('${2}')",
        ),
    ];

    RewritePass::new(
        "syntax-ops",
        "Remove braces around t() calls that follow ||, &&, ? or :",
        "Fixed operator syntax errors.",
        rules,
    )
}

fn i18n_variable() -> RewritePass {
    let rules = vec![
        RewriteRule::literal(
            "i18n-variable-01",
            "const { t, i18n } = useTranslation()",
            "const { t, lang } = useTranslation()",
        ),
        RewriteRule::literal("i18n-variable-02", "i18n.language", "lang"),
    ];

    RewritePass::new(
        "i18n-variable",
        "Use the `lang` value from useTranslation() instead of i18n.language",
        "Fixed i18n variable usage.",
        rules,
    )
}

const PASSWORD_CLEANUP_BLOCK: &str = "// Clean up validation error messages (e.g., password pattern errors)
    if (typeof errorMessage === 'string' && errorMessage.includes('fails to match the required pattern')) {
      if (errorMessage.includes('password')) {
        errorMessage = 'Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character';
      }
    }";

fn api_cleanup() -> RewritePass {
    let rules = vec![
        RewriteRule::literal("api-cleanup-01", PASSWORD_CLEANUP_BLOCK, "").limit(1),
        RewriteRule::literal(
            "api-cleanup-02",
            "    let errorMessage = errorData.message",
            "    const errorMessage = errorData.message",
        )
        .limit(1),
    ];

    RewritePass::new(
        "api-cleanup",
        "Drop the password validation message rewrite from the API error handler",
        "Fixed api.js - removed password validation cleanup",
        rules,
    )
    .with_target(API_TARGET)
}
