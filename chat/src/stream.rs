use messages_response::{
    ContentBlockStartData, Delta, MessageDeltaData, MessageStartData, StreamEvent, Usage,
    UsageDelta,
};
use response::ChatCompletionsChunk;
use tracing::debug;

use crate::converters::map_finish_reason;

#[derive(Debug, PartialEq)]
enum OpenBlock {
    None,
    Text,
    Tool,
}

/// Rebuilds block-structured stream events from flat delta-protocol
/// frames. One converter per in-flight stream; block indices are assigned
/// in open order and never reused, and at most one block is open at a
/// time. Everything emitted as output text or tool-argument fragments is
/// accumulated so the final usage can be tokenized locally.
pub struct EventConverter {
    message_id: String,
    model: String,
    input_tokens: i32,
    content_index: i32,
    open_block: OpenBlock,
    output_buffer: String,
    stop_reason: Option<&'static str>,
}

impl EventConverter {
    pub fn new(message_id: String, model: String, input_tokens: i32) -> Self {
        Self {
            message_id,
            model,
            input_tokens,
            content_index: 0,
            open_block: OpenBlock::None,
            output_buffer: String::new(),
            stop_reason: None,
        }
    }

    /// Opening event for the stream. The input count is the locally
    /// estimated request size; the output count is a placeholder until
    /// `finish` reports the real figure.
    pub fn message_start(&self) -> StreamEvent {
        StreamEvent::MessageStart {
            message: MessageStartData {
                id: self.message_id.clone(),
                message_type: "message".to_string(),
                role: "assistant".to_string(),
                content: vec![],
                model: self.model.clone(),
                stop_reason: None,
                stop_sequence: None,
                usage: Usage {
                    input_tokens: self.input_tokens,
                    output_tokens: 1,
                },
            },
        }
    }

    /// One state-machine step per upstream frame.
    pub fn convert(&mut self, chunk: &ChatCompletionsChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let Some(choice) = chunk.choices.first() else {
            return events;
        };

        if let Some(finish_reason) = choice.finish_reason.as_deref() {
            self.stop_reason = Some(map_finish_reason(Some(finish_reason)));
        }

        if let Some(text) = choice.delta.content.as_ref().filter(|text| !text.is_empty()) {
            if self.open_block != OpenBlock::Text {
                self.close_open_block(&mut events);
                events.push(StreamEvent::ContentBlockStart {
                    index: self.content_index,
                    content_block: ContentBlockStartData::Text {
                        text: String::new(),
                    },
                });
                self.open_block = OpenBlock::Text;
            }

            self.output_buffer.push_str(text);
            events.push(StreamEvent::ContentBlockDelta {
                index: self.content_index,
                delta: Delta::TextDelta { text: text.clone() },
            });
        }

        for call in choice.delta.tool_calls.iter().flatten() {
            if let Some(id) = &call.id {
                self.close_open_block(&mut events);
                events.push(StreamEvent::ContentBlockStart {
                    index: self.content_index,
                    content_block: ContentBlockStartData::ToolUse {
                        id: id.clone(),
                        name: call
                            .function
                            .as_ref()
                            .and_then(|function| function.name.clone())
                            .unwrap_or_default(),
                        input: serde_json::json!({}),
                    },
                });
                self.open_block = OpenBlock::Tool;
            }

            let arguments = call
                .function
                .as_ref()
                .and_then(|function| function.arguments.as_ref())
                .filter(|arguments| !arguments.is_empty());
            if let Some(arguments) = arguments {
                if self.open_block != OpenBlock::Tool {
                    debug!("Dropping argument fragment with no open tool_use block");
                    continue;
                }

                self.output_buffer.push_str(arguments);
                events.push(StreamEvent::ContentBlockDelta {
                    index: self.content_index,
                    delta: Delta::InputJsonDelta {
                        partial_json: arguments.clone(),
                    },
                });
            }
        }

        events
    }

    /// Terminal events once the upstream is exhausted: close the open
    /// block, report the finish reason and the locally tokenized output
    /// count, then stop the message.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.close_open_block(&mut events);

        events.push(StreamEvent::MessageDelta {
            delta: MessageDeltaData {
                stop_reason: Some(self.stop_reason.unwrap_or("end_turn").to_string()),
                stop_sequence: None,
            },
            usage: UsageDelta {
                output_tokens: tokens::count_tokens(&self.output_buffer),
            },
        });
        events.push(StreamEvent::MessageStop);
        events
    }

    fn close_open_block(&mut self, events: &mut Vec<StreamEvent>) {
        if self.open_block != OpenBlock::None {
            events.push(StreamEvent::ContentBlockStop {
                index: self.content_index,
            });
            self.content_index += 1;
            self.open_block = OpenBlock::None;
        }
    }
}
