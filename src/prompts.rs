use crate::events::Role;

/// Built-in persona prompt, sent as the leading system message.
pub const PERSONA_PROMPT: &str = "あなたは共感的で丁寧な心理カウンセラーです。直近1週間であった嫌なことについて語られるので、相手の語りを引き出す質問をしてください。話しすぎることは避けて、感情の整理を手伝ってください。";

/// Shown when the completion call succeeded but carried no reply text.
pub const EMPTY_REPLY_FALLBACK: &str = "⚠️ エラー: 応答が得られませんでした。";

/// Shown when the completion call itself failed.
pub const TRANSPORT_FAILURE_FALLBACK: &str = "⚠️ エラー: 通信に失敗しました。";

pub const TITLE: &str = "AIセラピストとの会話";
pub const INTRO: &str = "「こんにちは」と挨拶を送って入室を知らせてください。";
pub const INPUT_PLACEHOLDER: &str = "メッセージを入力";
pub const CLEAR_LABEL: &str = "チャット内容を削除する";
pub const RESPONDING_LABEL: &str = "AIセラピストが入力中";

/// Transcript label for a speaker
pub fn speaker_label(role: Role) -> &'static str {
    match role {
        Role::User => "あなた",
        Role::Assistant => "AIセラピスト",
        Role::System => "system",
    }
}
