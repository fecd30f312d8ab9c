//! Prompt construction for talk generation.
//!
//! Every function here is pure: the same input and configuration always render
//! byte-identical prompts. User-supplied text is embedded verbatim; forbidden
//! words are handed to the generator, not filtered locally.

use crate::talk::core::config::PromptConfig;
use crate::talk::core::model::{BeatName, EpisodeInput};
use crate::talk::prompt::length_budget::LengthBudget;

/// Longest spoken line requested from the generator, in characters.
pub const MAX_LINE_CHARS: usize = 80;

/// Fixed system instruction.
const SYSTEM_PROMPT: &str = r"あなたは日本語の「間」と毒の弱いユーモアを得意とする放送作家です。
ユーザーの体験談を、聞き手と場面に合ったトーンのトークに仕立てます。

構成:
- フック→事実→ズレ→展開→オチ→余韻の6ビートで組み立てる
- ビートごとに秒数を配分し、要約を付ける

台本:
- 口語で、1行80字以内
- [間1.0s] のような演出、擬音、比喩、コールバックを使ってよい
- 台本textの合計文字数は指定範囲（目標の±15%）に収める

安全:
- 実名・会社名などの固有名詞は友人A/会社Bのように匿名化する
- 差別や誹謗中傷は弱毒化する
- NGワードは出力に含めない

出力:
- スライド（TITLE/BULLETS/PUNCHLINE）も作る
- 与えられたJSONスキーマに完全に準拠したJSONだけを返す";

/// Stylistic tier selected from the embellishment rate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EmbellishmentTier {
    /// Stick to the facts.
    Factual,
    /// Moderate figurative language.
    Moderate,
    /// Maximal exaggeration while keeping the plot.
    Maximal,
}

impl EmbellishmentTier {
    /// Nearest of the 0 / 50 / 100 anchors.
    #[must_use]
    pub const fn from_rate(rate: u8) -> Self {
        match rate {
            0..=25 => Self::Factual,
            26..=75 => Self::Moderate,
            _ => Self::Maximal,
        }
    }

    /// Guidance line for this tier.
    #[must_use]
    pub const fn guidance(self) -> &'static str {
        match self {
            Self::Factual => "事実に忠実に。誇張や脚色はしない",
            Self::Moderate => "比喩や言い回しで適度に脚色する",
            Self::Maximal => "筋は変えずに、最大限に誇張して盛る",
        }
    }
}

/// System prompt, length budget and user prompt for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptSet {
    /// Acceptable script length.
    pub budget: LengthBudget,
    /// System instruction.
    pub system: String,
    /// User instruction.
    pub user: String,
}

impl PromptSet {
    /// Compute the budget and render both prompts.
    #[must_use]
    pub fn prepare(input: &EpisodeInput, config: &PromptConfig) -> Self {
        let budget = LengthBudget::from_duration(input.duration_sec, config.chars_per_sec);
        Self {
            budget,
            system: build_system_prompt(),
            user: build_user_prompt(input, &budget, config),
        }
    }
}

/// Build the fixed system prompt.
#[must_use]
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Build the user prompt embedding every input field and the length budget.
#[must_use]
pub fn build_user_prompt(input: &EpisodeInput, budget: &LengthBudget, config: &PromptConfig) -> String {
    let ng = if input.ng.is_empty() {
        "（なし）".to_string()
    } else {
        input.ng.join(", ")
    };

    let mut out = String::with_capacity(1024);

    out.push_str("入力:\n");
    push_item(&mut out, "いつ", &input.when);
    push_item(&mut out, "どこ", &input.place);
    push_item(&mut out, "誰と", &input.who);
    push_item(&mut out, "何が", &input.what);
    push_item(&mut out, "感情", &input.emotion);
    push_item(&mut out, "ターゲット", input.target.as_str());
    push_item(&mut out, "トーン", input.tone.as_str());
    push_item(&mut out, "尺(秒)", &input.duration_sec.to_string());
    push_item(&mut out, "NGワード", &ng);
    push_item(&mut out, "盛り率", &format!("{}%", input.embellishment_rate));

    out.push_str("\n文字数:\n");
    push_item(&mut out, "目標", &format!("{}字（台本textの合計）", budget.target_chars));
    push_item(
        &mut out,
        "許容範囲",
        &format!("{}〜{}字", budget.min_chars, budget.max_chars),
    );

    out.push_str("\n要件:\n");
    render_requirements(&mut out, config);

    out.push('\n');
    render_embellishment(&mut out, input.embellishment_rate);

    out
}

fn push_item(out: &mut String, label: &str, value: &str) {
    out.push_str("- ");
    out.push_str(label);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}

fn render_requirements(out: &mut String, config: &PromptConfig) {
    let arc: Vec<&str> = BeatName::ALL.iter().map(|b| b.as_str()).collect();

    out.push_str(&format!(
        "1) 構成: {}の{}ビート。各ビートに秒数を配分する。\n",
        arc.join("→"),
        arc.len()
    ));
    out.push_str(&format!(
        "2) 台本: 口語で1行{MAX_LINE_CHARS}字以内。各行に秒数目安と[間x.xs]などの演出を入れ、間の秒数をpauseに入れる。\n"
    ));
    if config.max_alternatives == 0 {
        out.push_str("3) 言い換え候補は出さない（alternativesは空配列）。\n");
    } else {
        out.push_str(&format!(
            "3) 言い換え候補を各行{}個まで付ける。\n",
            config.max_alternatives
        ));
    }
    out.push_str("4) スライド: TITLE/BULLETS/PUNCHLINEで3〜6枚。箇条書きは1枚5項目まで。\n");
    out.push_str("5) 匿名化: 固有名詞を友人A/会社Bなどに置き換え、匿名化レベルを0〜2で評価する。\n");
    out.push_str("6) NGワードを含めない。含む恐れがある場合はwarningsに説明を書く。\n");
}

fn render_embellishment(out: &mut String, rate: u8) {
    out.push_str("盛り方（盛り率");
    out.push_str(&rate.to_string());
    out.push_str("%）:\n");
    push_item(out, "0%", EmbellishmentTier::Factual.guidance());
    push_item(out, "50%", EmbellishmentTier::Moderate.guidance());
    push_item(out, "100%", EmbellishmentTier::Maximal.guidance());
    out.push_str("今回の基準: ");
    out.push_str(EmbellishmentTier::from_rate(rate).guidance());
    out.push_str("。\n");
}

/// Build the corrective prompt asking for a script whose total length fits `budget`.
#[must_use]
pub fn build_adjustment_prompt(line_texts: &[&str], budget: &LengthBudget) -> String {
    let current: usize = line_texts.iter().map(|t| t.chars().count()).sum();
    let direction = if current > budget.max_chars {
        "短く"
    } else {
        "長く"
    };

    let mut out = String::with_capacity(512 + line_texts.iter().map(|t| t.len()).sum::<usize>());

    out.push_str(&format!(
        "前回の台本は合計{current}字で、許容範囲{}〜{}字（目標{}字）に収まっていません。\n",
        budget.min_chars, budget.max_chars, budget.target_chars
    ));
    out.push_str("ビート数、各ビートのsummary、スライドは変えずに、台本を");
    out.push_str(direction);
    out.push_str("書き直してください。\n");
    out.push_str(&format!(
        "台本textを連結した文字数が{}〜{}字になるようにし、同じJSONスキーマで全体を出力してください。\n",
        budget.min_chars, budget.max_chars
    ));

    out.push_str("\n前回の台本:\n");
    for (index, text) in line_texts.iter().enumerate() {
        out.push_str(&(index + 1).to_string());
        out.push_str(". ");
        out.push_str(text);
        out.push('\n');
    }

    out
}
