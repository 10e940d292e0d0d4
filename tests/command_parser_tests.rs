use tldr_digest::slack::command_parser::{
    ConfigAction, TldrCommand, decode_url_component, parse_channel_arg, parse_form_data,
};

#[test]
fn test_decode_url_component() {
    assert_eq!(decode_url_component("hello%20world").unwrap(), "hello world");
    assert_eq!(decode_url_component("hello+world").unwrap(), "hello world");
    assert_eq!(
        decode_url_component("test%40example.com%26param%3Dvalue").unwrap(),
        "test@example.com&param=value"
    );
}

#[test]
fn test_parse_form_data_success() {
    let form_data = "token=abc123&team_id=T123&team_domain=example&\
                    channel_id=C123&channel_name=general&user_id=U123&\
                    user_name=username&command=%2Ftldr&text=now&\
                    response_url=https%3A%2F%2Fhooks.slack.com%2F&\
                    trigger_id=123.456&command_ts=1609753200";

    let event = parse_form_data(form_data).unwrap();

    assert_eq!(event.team_id, "T123");
    assert_eq!(event.channel_id, "C123");
    assert_eq!(event.channel_name, "general");
    assert_eq!(event.user_id, "U123");
    assert_eq!(event.command, "/tldr");
    assert_eq!(event.text, "now");
    assert_eq!(event.response_url, "https://hooks.slack.com/");
}

#[test]
fn test_parse_form_data_missing_fields_default_to_empty() {
    let event = parse_form_data("command=%2Ftldr").unwrap();
    assert_eq!(event.command, "/tldr");
    assert!(event.text.is_empty());
    assert!(event.response_url.is_empty());
}

#[test]
fn test_full_config_command_from_form() {
    let event = parse_form_data("command=%2Ftldr&text=config+remove+%3C%23C0ABC123%7Crandom%3E").unwrap();
    assert_eq!(
        TldrCommand::parse(&event.text),
        TldrCommand::Config {
            action: ConfigAction::Remove,
            channel: Some("C0ABC123".to_string()),
        }
    );
}

#[test]
fn test_channel_argument_forms() {
    assert_eq!(parse_channel_arg("<#C0ABC123|random>").as_deref(), Some("C0ABC123"));
    assert_eq!(parse_channel_arg("<#C0ABC123>").as_deref(), Some("C0ABC123"));
    assert_eq!(parse_channel_arg("G0PRIVATE").as_deref(), Some("G0PRIVATE"));
    assert_eq!(parse_channel_arg("random"), None);
}
