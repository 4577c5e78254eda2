use chrono::{NaiveDate, NaiveDateTime};
use parking_forms::{
    FormBehaviorController, Page, Result, ScriptedPrompt, PLATE_REQUIRED_MESSAGE,
};

const CHECKIN_HTML: &str = r#"
    <h2>Vehicle check-in</h2>
    <form action="/parking/4/checkin" method="post">
      <input type="text" name="licensePlate" placeholder="License plate">
      <input type="hidden" name="reservedFromApp" value="false">
      <button type="submit">Check in</button>
    </form>
    "#;

fn loaded_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|date| date.and_hms_opt(14, 20, 0))
        .expect("valid timestamp")
}

fn checkin_page() -> Result<(Page, ScriptedPrompt)> {
    let mut page = Page::from_html(CHECKIN_HTML, loaded_at())?;
    let prompt = ScriptedPrompt::new();
    page.set_prompt(Box::new(prompt.clone()));
    FormBehaviorController::install(&mut page)?;
    Ok((page, prompt))
}

#[test]
fn plate_is_uppercased_after_every_keystroke() -> Result<()> {
    let (mut page, _prompt) = checkin_page()?;
    let typed = "ab123cd";
    for end in 1..=typed.len() {
        page.type_text(r#"input[name="licensePlate"]"#, &typed[..end])?;
        page.assert_value(
            r#"input[name="licensePlate"]"#,
            &typed[..end].to_uppercase(),
        )?;
    }
    assert_eq!(page.value_of(r#"input[name="licensePlate"]"#)?, "AB123CD");
    Ok(())
}

#[test]
fn empty_plate_blocks_submission_with_a_notice() -> Result<()> {
    let (mut page, prompt) = checkin_page()?;
    page.click("form button")?;
    assert!(page.submissions().is_empty());
    assert_eq!(prompt.notifications(), vec![PLATE_REQUIRED_MESSAGE.to_string()]);
    Ok(())
}

#[test]
fn whitespace_only_plate_blocks_submission() -> Result<()> {
    let (mut page, prompt) = checkin_page()?;
    page.type_text(r#"input[name="licensePlate"]"#, "   ")?;
    page.click("form button")?;
    assert!(page.submissions().is_empty());
    assert_eq!(prompt.notifications(), vec![PLATE_REQUIRED_MESSAGE.to_string()]);
    Ok(())
}

#[test]
fn valid_plate_submits_the_normalized_value() -> Result<()> {
    let (mut page, prompt) = checkin_page()?;
    page.type_text(r#"input[name="licensePlate"]"#, "xyz123")?;
    page.click("form button")?;

    assert!(prompt.notifications().is_empty());
    assert_eq!(page.submissions().len(), 1);
    let submission = &page.submissions()[0];
    assert_eq!(submission.action, "/parking/4/checkin");
    assert_eq!(submission.method, "post");
    assert_eq!(
        submission.data,
        vec![
            ("licensePlate".to_string(), "XYZ123".to_string()),
            ("reservedFromApp".to_string(), "false".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn form_without_a_plate_input_submits_unguarded() -> Result<()> {
    let mut page = Page::from_html(
        r#"
        <form action="/parking/4/checkin" method="post">
          <input type="hidden" name="reservedFromApp" value="true">
          <button type="submit">Check in</button>
        </form>
        "#,
        loaded_at(),
    )?;
    let prompt = ScriptedPrompt::new();
    page.set_prompt(Box::new(prompt.clone()));
    FormBehaviorController::install(&mut page)?;

    page.click("form button")?;
    assert_eq!(page.submissions().len(), 1);
    assert!(prompt.notifications().is_empty());
    Ok(())
}

#[test]
fn uppercase_normalization_covers_every_plate_input_on_the_page() -> Result<()> {
    let mut page = Page::from_html(
        r#"
        <form action="/parking/4/checkin" method="post">
          <input id="first" type="text" name="licensePlate">
        </form>
        <form action="/attendant/search" method="get">
          <input id="second" type="text" name="licensePlate">
        </form>
        "#,
        loaded_at(),
    )?;
    FormBehaviorController::install(&mut page)?;

    page.type_text("#first", "aaa")?;
    page.type_text("#second", "bbb")?;
    page.assert_value("#first", "AAA")?;
    page.assert_value("#second", "BBB")?;
    Ok(())
}
