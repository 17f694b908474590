// Test fixtures with known texts and the hits they must produce
// WHY: Deterministic inputs let integration tests assert exact positions
#![allow(dead_code)]

/// Scenario text whose stripped form is exactly "abcabcabc"
pub const ABC_TEXT: &str = "ab-c a.b c, a bc!";

/// Opening of Genesis in English, punctuation and line breaks included
pub const GENESIS_EN: &str = "In the beginning God created the heaven and the earth.\r\n\
And the earth was without form, and void; and darkness was upon the face of the deep.\r\n\
And the Spirit of God moved upon the face of the waters.\r\n";

/// Opening of Genesis in Hebrew (unpointed), including final letter forms
pub const GENESIS_HE: &str = "בראשית ברא אלהים את השמים ואת הארץ׃\n\
והארץ היתה תהו ובהו וחשך על־פני תהום";

/// Text where "torah" is planted at skip 5 starting at letter 2
pub const PLANTED_TEXT: &str = "xx t xxxx o xxxx r xxxx a xxxx h xxxx";

/// Stripped start and skip of the planted "torah"
pub const PLANTED_START: usize = 2;
pub const PLANTED_SKIP: i64 = 5;

/// Mixed-case text for case handling
pub const MIXED_CASE_TEXT: &str = "GoD gOd GOD god";
