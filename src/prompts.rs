//! Localized prompt text and canned replies.

use crate::config::AssistantConfig;
use crate::language::Language;
use crate::models::RetrievalResult;

/// Context placeholder used when retrieval found nothing.
pub fn no_context(lang: Language) -> &'static str {
    match lang {
        Language::Vi => "Không có thông tin cụ thể.",
        Language::En => "No specific information available.",
    }
}

/// Reply used whenever the model call fails or returns nothing usable.
pub fn fallback_answer(lang: Language) -> &'static str {
    match lang {
        Language::Vi => "Xin lỗi, tôi đang gặp sự cố. Vui lòng thử lại sau!",
        Language::En => "Sorry, I'm having issues. Please try again later!",
    }
}

/// Reply to a blank question.
pub fn invalid_query(lang: Language) -> &'static str {
    match lang {
        Language::Vi => "Vui lòng cung cấp câu hỏi hợp lệ.",
        Language::En => "Please ask a valid question.",
    }
}

/// Render retrieved chunks as `[source] text` blocks separated by blank lines.
pub fn format_context(results: &[RetrievalResult], lang: Language) -> String {
    if results.is_empty() {
        return no_context(lang).to_string();
    }
    results
        .iter()
        .map(|r| format!("[{}] {}", r.chunk.source_label, r.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System message: persona, scope, answer language, and the context block.
pub fn system_prompt(assistant: &AssistantConfig, context: &str, lang: Language) -> String {
    let name = &assistant.name;
    let region = &assistant.region;
    match lang {
        Language::Vi => format!(
            "Bạn là {name}, trợ lý du lịch của {region}, Việt Nam.\n\
             Chỉ trả lời các câu hỏi về du lịch tại {region}: điểm tham quan, lịch trình, \
             lưu trú, ẩm thực, văn hóa, lịch sử, giao thông, thời tiết, chi phí và hoạt động giải trí.\n\
             Nếu câu hỏi không liên quan đến du lịch hoặc nằm ngoài {region}, hãy lịch sự từ chối \
             và gợi ý một câu hỏi về du lịch {region} mà bạn có thể trả lời.\n\
             Chỉ dựa vào thông tin bên dưới. Nếu thông tin không đủ, hãy nói rõ điều đó.\n\
             Trả lời bằng tiếng Việt, ngắn gọn và thân thiện.\n\n\
             Thông tin liên quan:\n{context}"
        ),
        Language::En => format!(
            "You are {name}, a travel assistant for {region}, Vietnam.\n\
             Only answer questions about travel in {region}: attractions, itineraries, \
             accommodation, food, culture, history, transport, weather, costs and activities.\n\
             If a question is unrelated to travel or outside {region}, politely decline \
             and suggest a question about travel in {region} that you can answer.\n\
             Rely only on the information below. If it is not enough, say so plainly.\n\
             Answer in English, briefly and in a friendly tone.\n\n\
             Relevant information:\n{context}"
        ),
    }
}
