//! Prompt 构建服务
//!
//! 固定的指令模板 + 按请求渲染的上下文模板。模板中的槽位写作 `{{name}}`，
//! 渲染是一次性的从左到右替换，替换进去的字段值不会被再次扫描。

use std::collections::HashMap;

use crate::llm::ChatMessage;
use crate::models::{is_present, SuggestionRequest};

/// 系统提示词
const SYSTEM_PROMPT: &str = r#"Você é um assistente de IA que ajuda proprietários a criar notificações relevantes e oportunas para seus inquilinos.

Com base nos dados em tempo real fornecidos pelo proprietário, sugira UMA mensagem de notificação para enviar aos inquilinos.

Considere estes fatores ao redigir a notificação: urgência, relevância para os inquilinos e potencial impacto em suas vidas diárias. Use a informação que está disponível e é mais relevante.
Evite notificações duplicadas ou desnecessárias: se as notificações anteriores já trataram do mesmo assunto recentemente, não repita o aviso.

A mensagem deve poder ser enviada diretamente aos inquilinos, sem comentários adicionais dirigidos ao proprietário.

Responda sempre em {{outputLanguage}}.

Formate sua resposta como um objeto JSON com exatamente as seguintes chaves:
- notificationMessage: a mensagem de notificação sugerida.
- reasoning: uma explicação curta de quais informações foram consideradas e por quê.
Não inclua outras chaves nem texto fora do objeto JSON."#;

/// 上下文模板
const CONTEXT_TEMPLATE: &str = r#"Dados fornecidos pelo proprietário:

Previsão do Tempo: {{weatherForecast}}
Eventos da Cidade: {{cityEvents}}
Cronograma de Manutenção: {{maintenanceSchedule}}
Notificações Anteriores: {{pastNotifications}}"#;

/// 字段为空时写入的占位文本
const NOT_PROVIDED: &str = "(não informado)";

/// 模板渲染错误
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("模板引用了未提供的槽位: {0}")]
    UnknownSlot(String),
}

/// 单次渲染模板
///
/// 未闭合的 `{{` 按普通文本处理
pub fn render_template(template: &str, slots: &HashMap<&str, &str>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        match after_open.find("}}") {
            Some(end) => {
                let name = after_open[..end].trim();
                let value = slots
                    .get(name)
                    .ok_or_else(|| TemplateError::UnknownSlot(name.to_string()))?;
                out.push_str(value);
                rest = &after_open[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Prompt 服务
pub struct PromptService {
    output_language: String,
}

impl PromptService {
    /// 创建新的 Prompt 服务
    pub fn new(output_language: impl Into<String>) -> Self {
        Self {
            output_language: output_language.into(),
        }
    }

    /// 渲染系统指令
    pub fn system_prompt(&self) -> Result<String, TemplateError> {
        let slots = HashMap::from([("outputLanguage", self.output_language.as_str())]);
        render_template(SYSTEM_PROMPT, &slots)
    }

    /// 渲染上下文消息
    pub fn context_prompt(&self, request: &SuggestionRequest) -> Result<String, TemplateError> {
        let slots = HashMap::from([
            ("weatherForecast", slot_value(&request.weather_forecast)),
            ("cityEvents", slot_value(&request.city_events)),
            ("maintenanceSchedule", slot_value(&request.maintenance_schedule)),
            ("pastNotifications", slot_value(&request.past_notifications)),
        ]);
        render_template(CONTEXT_TEMPLATE, &slots)
    }

    /// 构建发送给模型的消息列表
    pub fn build_messages(&self, request: &SuggestionRequest) -> Result<Vec<ChatMessage>, TemplateError> {
        Ok(vec![
            ChatMessage::system(self.system_prompt()?),
            ChatMessage::user(self.context_prompt(request)?),
        ])
    }
}

fn slot_value(field: &Option<String>) -> &str {
    if is_present(field) {
        field.as_deref().unwrap_or(NOT_PROVIDED)
    } else {
        NOT_PROVIDED
    }
}

impl Default for PromptService {
    fn default() -> Self {
        Self::new("português brasileiro")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rain_request() -> SuggestionRequest {
        SuggestionRequest {
            weather_forecast: Some("Heavy rain expected tomorrow".to_string()),
            city_events: Some(String::new()),
            maintenance_schedule: Some(String::new()),
            past_notifications: Some(String::new()),
        }
    }

    #[test]
    fn test_render_template_basic() {
        let slots = HashMap::from([("a", "1"), ("b", "2")]);
        assert_eq!(render_template("x={{a}}, y={{ b }}", &slots).unwrap(), "x=1, y=2");
        assert_eq!(render_template("sem slots", &slots).unwrap(), "sem slots");
        assert_eq!(render_template("aberto {{a", &slots).unwrap(), "aberto {{a");
    }

    #[test]
    fn test_render_template_unknown_slot() {
        let slots = HashMap::from([("a", "1")]);
        assert_eq!(
            render_template("{{missing}}", &slots),
            Err(TemplateError::UnknownSlot("missing".to_string()))
        );
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let slots = HashMap::from([("a", "{{b}}"), ("b", "segredo")]);
        assert_eq!(render_template("{{a}}", &slots).unwrap(), "{{b}}");
    }

    #[test]
    fn test_context_prompt_embeds_fields() {
        let prompt = PromptService::default().context_prompt(&rain_request()).unwrap();
        assert!(prompt.contains("Previsão do Tempo: Heavy rain expected tomorrow"));
        assert!(prompt.contains("Eventos da Cidade: (não informado)"));
        assert!(prompt.contains("Notificações Anteriores: (não informado)"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_field_cannot_break_out_of_slot() {
        let request = SuggestionRequest {
            weather_forecast: Some("{{pastNotifications}} }} {{".to_string()),
            past_notifications: Some("Aviso enviado ontem".to_string()),
            ..Default::default()
        };
        let prompt = PromptService::default().context_prompt(&request).unwrap();
        assert!(prompt.contains("Previsão do Tempo: {{pastNotifications}} }} {{"));
        assert_eq!(prompt.matches("Aviso enviado ontem").count(), 1);
    }

    #[test]
    fn test_system_prompt_contract() {
        let prompt = PromptService::new("English").system_prompt().unwrap();
        assert!(prompt.contains("Responda sempre em English."));
        assert!(prompt.contains("assistente de IA"));
        assert!(prompt.contains("duplicadas"));
        assert!(prompt.contains("urgência"));
        assert!(prompt.contains("notificationMessage"));
        assert!(prompt.contains("reasoning"));
        assert!(prompt.contains("JSON"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_build_messages_roles() {
        let messages = PromptService::default().build_messages(&rain_request()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
    }
}
