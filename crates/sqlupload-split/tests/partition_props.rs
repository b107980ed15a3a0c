//! Property tests for the shell/payload partition.

use proptest::prelude::*;
use sqlupload_split::{LinkTargets, split_markup};

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z .,:]{1,8}",
        Just("<p>".to_string()),
        Just("</p>".to_string()),
        Just("<br/>".to_string()),
        Just("<span class=\"v\">".to_string()),
        Just("</span>".to_string()),
        Just("<!-- note -->".to_string()),
        Just("&amp;".to_string()),
        Just("&#176;".to_string()),
        Just("\n".to_string()),
    ]
}

fn markup() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..12).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn partition_reconstructs_document(
        prefix in markup(),
        inner in markup(),
        suffix in markup(),
    ) {
        let doc = format!("{prefix}<div>{inner}</div>{suffix}");
        let result = split_markup(&doc, "div", &LinkTargets::none(), "").unwrap();

        prop_assert_eq!(result.shell.unwrap(), format!("{prefix}<div></div>{suffix}"));
        prop_assert_eq!(String::from_utf8(result.payload).unwrap(), inner);
    }

    #[test]
    fn stub_follows_divider_start_tag(inner in markup(), stub in "[A-Z]{1,6}") {
        let doc = format!("<html><div id=\"d\">{inner}</div></html>");
        let result = split_markup(&doc, "div", &LinkTargets::none(), &stub).unwrap();

        prop_assert_eq!(
            result.shell.unwrap(),
            format!("<html><div id=\"d\">{stub}</div></html>")
        );
    }

    #[test]
    fn none_divider_keeps_everything_dynamic(doc in markup()) {
        let result = split_markup(&doc, "none", &LinkTargets::none(), "S").unwrap();
        prop_assert_eq!(result.shell.as_deref(), Some("S"));
        prop_assert_eq!(String::from_utf8(result.payload).unwrap(), doc);
    }
}
